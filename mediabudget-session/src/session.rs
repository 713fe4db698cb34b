//! Edit session: one snapshot, edited one field at a time.
//!
//! Every edit is applied to a draft, intents are reconciled, and the draft is
//! recalculated. A fatal report leaves the session on its previous snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use mediabudget_core::domain::{
    BudgetMode, BudgetSnapshot, CurrencyCode, FeeOverrides, FeeSelection, OptionId, UnitTypeId,
    FEE_SLOT_COUNT,
};
use mediabudget_core::engine::{try_calculate, CalculationError, CalculationReport};
use mediabudget_core::options::EngineOptions;

use crate::intent::{IntentTracker, Restored};
use crate::persist::StoredSnapshot;
use crate::provider::{context, FeeConfigProvider, RateProvider};

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("fee slot {slot_number} does not exist, slots are numbered 1 to {max}", max = FEE_SLOT_COUNT)]
    SlotOutOfRange { slot_number: usize },

    #[error("fee slot {slot_number} has no option selected")]
    NoOptionSelected { slot_number: usize },

    #[error("initial calculation failed: {0}")]
    Calculation(#[from] CalculationError),
}

/// A single user edit. Slots are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum BudgetEdit {
    /// Switch which total is authoritative. The current value of the new
    /// authoritative total becomes the input, so nothing moves.
    SetMode { mode: BudgetMode },
    SetBudgetInput { amount: Decimal },
    SetUnitPrice { price: Decimal },
    SetUnitType { unit_type: Option<UnitTypeId> },
    SetBuyCurrency { currency: CurrencyCode },
    SetBonusActive { active: bool },
    SetNegotiatedValue { amount: Decimal },
    SetFeeActive { slot: usize, active: bool },
    /// Choose an option; overrides from a previous option are dropped.
    SelectOption { slot: usize, option_id: OptionId },
    SetValueOverride { slot: usize, value: Option<Decimal> },
    SetVolumeOverride { slot: usize, volume: Option<Decimal> },
    SetUnitCount { slot: usize, count: Option<Decimal> },
}

/// Result of one edit.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub report: CalculationReport,
    /// True when any derived figure differs from before the edit.
    pub changed: bool,
    pub restored: Vec<Restored>,
}

impl EditOutcome {
    pub fn applied(&self) -> bool {
        self.report.success
    }
}

pub struct EditSession<F, R> {
    fees: F,
    rates: R,
    options: EngineOptions,
    snapshot: BudgetSnapshot,
    intents: IntentTracker,
    report: CalculationReport,
}

impl<F: FeeConfigProvider, R: RateProvider> EditSession<F, R> {
    /// Start a session. The snapshot is calculated once; a fatal error here is
    /// returned since there is no previous state to fall back to.
    pub fn open(
        snapshot: BudgetSnapshot,
        fees: F,
        rates: R,
        options: EngineOptions,
    ) -> Result<Self, SessionError> {
        let mut intents = IntentTracker::from_snapshot(&snapshot);
        let calc = try_calculate(&snapshot, &context(&fees, &rates), &options)?;
        intents.observe(&calc.snapshot);
        Ok(Self { fees, rates, options, snapshot: calc.snapshot, intents, report: calc.report })
    }

    /// Resume from a persisted envelope, restoring intent the envelope lost.
    pub fn resume(
        stored: StoredSnapshot,
        intents: IntentTracker,
        fees: F,
        rates: R,
        options: EngineOptions,
    ) -> Result<(Self, Vec<Restored>), SessionError> {
        let mut snapshot = stored.snapshot;
        let restored = intents.reconcile(&mut snapshot);
        let mut session = Self::open(snapshot, fees, rates, options)?;
        session.intents = intents;
        session.intents.observe(&session.snapshot);
        Ok((session, restored))
    }

    pub fn snapshot(&self) -> &BudgetSnapshot {
        &self.snapshot
    }

    pub fn report(&self) -> &CalculationReport {
        &self.report
    }

    pub fn intents(&self) -> &IntentTracker {
        &self.intents
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Slots the user switched on that are not priced yet.
    pub fn pending_fees(&self) -> Vec<usize> {
        self.intents.pending_fees(&self.snapshot)
    }

    pub fn to_stored(&self) -> StoredSnapshot {
        StoredSnapshot::new(self.snapshot.clone())
    }

    /// Apply one edit and recalculate.
    ///
    /// `Err` means the edit itself was malformed and nothing was attempted.
    /// A fatal calculation comes back as `Ok` with `report.success == false`
    /// and the session unchanged.
    pub fn apply(&mut self, edit: BudgetEdit) -> Result<EditOutcome, SessionError> {
        let mut draft = self.snapshot.clone();
        let mut intents = self.intents.clone();
        apply_edit(&mut draft, &mut intents, edit)?;
        let restored = intents.reconcile(&mut draft);
        Ok(self.commit(draft, intents, restored))
    }

    /// Recalculate without an edit, e.g. after providers changed underneath.
    pub fn recalculate(&mut self) -> EditOutcome {
        let draft = self.snapshot.clone();
        let intents = self.intents.clone();
        let restored = Vec::new();
        self.commit(draft, intents, restored)
    }

    fn commit(&mut self, draft: BudgetSnapshot, mut intents: IntentTracker, restored: Vec<Restored>) -> EditOutcome {
        let ctx = context(&self.fees, &self.rates);
        match try_calculate(&draft, &ctx, &self.options) {
            Ok(calc) => {
                let changed = calc.report.fingerprint != self.report.fingerprint;
                if self.options.verbosity.debug() {
                    debug!(changed, client = %calc.snapshot.client_budget, "edit applied");
                }
                intents.observe(&calc.snapshot);
                self.snapshot = calc.snapshot;
                self.intents = intents;
                self.report = calc.report.clone();
                EditOutcome { report: calc.report, changed, restored }
            }
            Err(err) => {
                if self.options.verbosity.warnings() {
                    warn!(error = %err, "edit rejected, keeping previous budget");
                }
                EditOutcome { report: CalculationReport::failed(&err), changed: false, restored: Vec::new() }
            }
        }
    }
}

fn apply_edit(
    snapshot: &mut BudgetSnapshot,
    intents: &mut IntentTracker,
    edit: BudgetEdit,
) -> Result<(), SessionError> {
    match edit {
        BudgetEdit::SetMode { mode } => {
            if mode != snapshot.budget_mode {
                snapshot.budget_input = match mode {
                    BudgetMode::MediaTotal => snapshot.media_budget,
                    BudgetMode::ClientTotal => snapshot.client_budget,
                };
                snapshot.budget_mode = mode;
            }
        }
        BudgetEdit::SetBudgetInput { amount } => snapshot.budget_input = amount,
        BudgetEdit::SetUnitPrice { price } => snapshot.unit_price = price,
        BudgetEdit::SetUnitType { unit_type } => snapshot.unit_type = unit_type,
        BudgetEdit::SetBuyCurrency { currency } => snapshot.buy_currency = currency,
        BudgetEdit::SetBonusActive { active } => {
            snapshot.bonus_active = active;
            if !active {
                snapshot.negotiated_value = Decimal::ZERO;
            }
            intents.set_bonus(active);
        }
        BudgetEdit::SetNegotiatedValue { amount } => snapshot.negotiated_value = amount,
        BudgetEdit::SetFeeActive { slot, active } => {
            let fee = slot_mut(snapshot, slot)?;
            if !active {
                fee.selection = FeeSelection::Inactive;
            } else if !fee.selection.is_active() {
                fee.selection = FeeSelection::ActiveUnselected;
            }
            intents.set_fee(slot, active);
        }
        BudgetEdit::SelectOption { slot, option_id } => {
            let fee = slot_mut(snapshot, slot)?;
            fee.selection = FeeSelection::selected(option_id.0);
            intents.set_fee(slot, true);
        }
        BudgetEdit::SetValueOverride { slot, value } => overrides_mut(snapshot, slot)?.value = value,
        BudgetEdit::SetVolumeOverride { slot, volume } => overrides_mut(snapshot, slot)?.volume = volume,
        BudgetEdit::SetUnitCount { slot, count } => overrides_mut(snapshot, slot)?.unit_count = count,
    }
    Ok(())
}

fn slot_mut(
    snapshot: &mut BudgetSnapshot,
    slot: usize,
) -> Result<&mut mediabudget_core::domain::FeeSlot, SessionError> {
    snapshot.fees.get_mut(slot).ok_or(SessionError::SlotOutOfRange { slot_number: slot + 1 })
}

fn overrides_mut(snapshot: &mut BudgetSnapshot, slot: usize) -> Result<&mut FeeOverrides, SessionError> {
    slot_mut(snapshot, slot)?
        .selection
        .overrides_mut()
        .ok_or(SessionError::NoOptionSelected { slot_number: slot + 1 })
}
