//! Budget snapshot: the unit of computation state for one tactic.
//!
//! The snapshot mixes user inputs (mode, input amount, unit price, fee
//! selections, ...) with derived fields written back by the engine. Derived
//! fields are never read as inputs, which keeps recalculation idempotent.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{CurrencyCode, OptionId, UnitTypeId};

/// Number of fee slots on a snapshot.
pub const FEE_SLOT_COUNT: usize = 5;

/// Which total the user typed in `budget_input`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetMode {
    /// Input is what is spent on media; the client total is derived.
    #[default]
    MediaTotal,
    /// Input is what the client is invoiced; the media budget is solved for.
    ClientTotal,
}

/// User supplied values that replace configured defaults for one fee slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeOverrides {
    /// Replaces the option's base value (editable options only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Decimal>,
    /// Replaces the computed unit volume for per-unit-volume fees (editable options only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
    /// Count used by per-unit-count fees. Defaults to 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_count: Option<Decimal>,
}

impl FeeOverrides {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.volume.is_none() && self.unit_count.is_none()
    }
}

/// A selected fee option plus its overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub option_id: OptionId,
    #[serde(default, skip_serializing_if = "FeeOverrides::is_empty")]
    pub overrides: FeeOverrides,
}

/// Selection state of a fee slot.
///
/// `ActiveUnselected` is a fee the user switched on without choosing an
/// option yet. It computes to zero but is not the same as `Inactive`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeeSelection {
    #[default]
    Inactive,
    ActiveUnselected,
    Selected(SelectedOption),
}

impl FeeSelection {
    pub fn selected(option_id: impl Into<String>) -> Self {
        Self::Selected(SelectedOption {
            option_id: OptionId::new(option_id),
            overrides: FeeOverrides::default(),
        })
    }

    pub fn selected_with(option_id: impl Into<String>, overrides: FeeOverrides) -> Self {
        Self::Selected(SelectedOption { option_id: OptionId::new(option_id), overrides })
    }

    /// True for anything other than `Inactive`.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Inactive)
    }

    pub fn option_id(&self) -> Option<&OptionId> {
        match self {
            Self::Selected(sel) => Some(&sel.option_id),
            _ => None,
        }
    }

    pub fn overrides(&self) -> Option<&FeeOverrides> {
        match self {
            Self::Selected(sel) => Some(&sel.overrides),
            _ => None,
        }
    }

    pub fn overrides_mut(&mut self) -> Option<&mut FeeOverrides> {
        match self {
            Self::Selected(sel) => Some(&mut sel.overrides),
            _ => None,
        }
    }
}

/// One of the five fee positions on a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSlot {
    #[serde(default)]
    pub selection: FeeSelection,
    /// Derived.
    #[serde(default)]
    pub computed_value: Decimal,
}

impl FeeSlot {
    pub fn new(selection: FeeSelection) -> Self {
        Self { selection, computed_value: Decimal::ZERO }
    }

    /// Active but currently worth nothing (no option yet, or volume pending).
    pub fn is_pending(&self) -> bool {
        self.selection.is_active() && self.computed_value.is_zero()
    }
}

/// Totals converted into the reference currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTotals {
    pub media_budget: Decimal,
    pub fees_total: Decimal,
    pub client_budget: Decimal,
}

/// Complete budget state for one tactic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetSnapshot {
    // ── Inputs ──
    pub budget_mode: BudgetMode,
    pub budget_input: Decimal,
    pub unit_price: Decimal,
    pub unit_type: Option<UnitTypeId>,
    pub bonus_active: bool,
    pub negotiated_value: Decimal,
    pub buy_currency: CurrencyCode,
    pub reference_currency: CurrencyCode,
    pub fees: [FeeSlot; FEE_SLOT_COUNT],

    // ── Derived ──
    pub unit_volume: Decimal,
    pub bonus_value: Decimal,
    pub media_budget: Decimal,
    pub client_budget: Decimal,
    pub currency_rate: Decimal,
    pub reference_totals: Option<ReferenceTotals>,
}

impl BudgetSnapshot {
    /// Fresh snapshot: zero budget, no fees, bonus inactive, single currency.
    pub fn new(currency: impl Into<String>) -> Self {
        let currency = CurrencyCode::new(currency);
        Self {
            buy_currency: currency.clone(),
            reference_currency: currency,
            currency_rate: Decimal::ONE,
            ..Self::default()
        }
    }

    pub fn with_budget(mut self, mode: BudgetMode, input: Decimal) -> Self {
        self.budget_mode = mode;
        self.budget_input = input;
        self
    }

    pub fn with_unit(mut self, unit_type: impl Into<String>, unit_price: Decimal) -> Self {
        self.unit_type = Some(UnitTypeId::new(unit_type));
        self.unit_price = unit_price;
        self
    }

    pub fn with_bonus(mut self, negotiated_value: Decimal) -> Self {
        self.bonus_active = true;
        self.negotiated_value = negotiated_value;
        self
    }

    pub fn with_fee(mut self, slot: usize, selection: FeeSelection) -> Self {
        if let Some(fee) = self.fees.get_mut(slot) {
            fee.selection = selection;
        }
        self
    }

    /// Sum of the five derived fee values.
    pub fn fees_total(&self) -> Decimal {
        self.fees.iter().map(|f| f.computed_value).sum()
    }

    /// Indices of slots that are active but computed to zero.
    pub fn pending_slots(&self) -> Vec<usize> {
        self.fees
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_pending())
            .map(|(i, _)| i)
            .collect()
    }
}
