//! Calculation report: outcome flag, fatal error text, convergence
//! diagnostics, advisory warnings and per-slot fee outcomes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{CurrencyCode, FeeId, UnitTypeId, FEE_SLOT_COUNT};
use crate::engine::CalculationError;

/// Why an active fee currently computes to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingReason {
    /// Fee switched on, option not chosen yet.
    NoOptionSelected,
    /// Per-unit-volume fee waiting for a unit price (volume undetermined or zero).
    VolumeUndetermined,
}

/// What the cascade did with one fee slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FeeOutcome {
    /// Slot not active.
    #[default]
    Disabled,
    /// Slot active but waiting on user input.
    Pending { reason: PendingReason },
    /// Slot active and priced.
    Computed { value: Decimal },
}

impl FeeOutcome {
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Disabled)
    }

    pub fn value(&self) -> Decimal {
        match self {
            Self::Computed { value } => *value,
            _ => Decimal::ZERO,
        }
    }
}

/// Recoverable conditions. The result is usable; the caller decides whether to
/// block the user or display a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    /// No rate for the buy currency; amounts left unconverted.
    MissingCurrencyRate { currency: CurrencyCode },
    /// Snapshot names a unit type the catalog does not know; priced per unit.
    UnknownUnitType { unit_type: UnitTypeId },
    /// Unit price is zero, so volume cannot be determined yet.
    VolumeUndetermined,
    /// Bonus is on but no negotiated value has been entered.
    BonusPending,
    /// Negotiated value is below the net media cost; bonus left at zero.
    NegotiatedBelowMedia { negotiated: Decimal, media: Decimal },
    /// An override was supplied for an option that is not editable.
    OverrideIgnored { slot_number: usize, fee_id: FeeId },
    /// Client-total solver stopped before reaching the tolerance.
    NotConverged { final_difference: Decimal },
    /// Fixed fees alone exceed the requested client total.
    TargetBelowFixedFees { target: Decimal, minimum_client_budget: Decimal },
}

/// One solver iteration, recorded at `Verbosity::Trace`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStep {
    pub iteration: u32,
    pub media_budget: Decimal,
    pub client_budget: Decimal,
    pub difference: Decimal,
}

/// Convergence diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceInfo {
    pub has_converged: bool,
    /// Signed gap `client - target`. The solver fills it at full precision;
    /// `calculate` replaces it with the gap of the stored, rounded figures.
    pub final_difference: Decimal,
    /// Bisection steps, bounded by `max_iterations`.
    pub iterations: u32,
    /// Evaluations spent on the zero-media floor and the upper bracket.
    #[serde(default)]
    pub bracket_evaluations: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<SolverStep>,
}

impl ConvergenceInfo {
    /// Media-total mode: nothing to solve.
    pub fn trivial() -> Self {
        Self {
            has_converged: true,
            final_difference: Decimal::ZERO,
            iterations: 0,
            bracket_evaluations: 0,
            steps: Vec::new(),
        }
    }
}

/// Report returned alongside the recalculated snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub convergence: Option<ConvergenceInfo>,
    #[serde(default)]
    pub advisories: Vec<Advisory>,
    #[serde(default)]
    pub fees: [FeeOutcome; FEE_SLOT_COUNT],
    /// BLAKE3 fingerprint of the derived fields of the returned snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl CalculationReport {
    /// Report for a calculation aborted by a fatal error.
    pub fn failed(err: &CalculationError) -> Self {
        Self {
            success: false,
            error: Some(err.to_string()),
            convergence: None,
            advisories: Vec::new(),
            fees: [FeeOutcome::Disabled; FEE_SLOT_COUNT],
            fingerprint: None,
        }
    }

    pub fn has_converged(&self) -> bool {
        self.convergence.as_ref().map_or(false, |c| c.has_converged)
    }

    /// True when the report carries anything a user should be warned about.
    pub fn has_warnings(&self) -> bool {
        !self.advisories.is_empty()
    }

    pub fn pending_slots(&self) -> Vec<usize> {
        self.fees
            .iter()
            .enumerate()
            .filter(|(_, o)| matches!(o, FeeOutcome::Pending { .. }))
            .map(|(i, _)| i)
            .collect()
    }
}
