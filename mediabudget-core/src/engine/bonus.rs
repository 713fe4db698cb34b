//! Bonification calculator.
//!
//! The bonus is extra media value the buyer negotiated on top of what is
//! paid: `bonus = negotiated - media` when the negotiated value covers the
//! net media cost.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusStatus {
    /// Bonus switched off; negotiated value cleared.
    Inactive,
    /// Bonus on, negotiated value not entered yet.
    Pending,
    /// Negotiated value below media budget. Validation failure, non-fatal.
    BelowMedia,
    Applied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bonification {
    /// Negotiated value to write back (forced to 0 when inactive).
    pub negotiated_value: Decimal,
    pub bonus_value: Decimal,
    pub status: BonusStatus,
}

/// Derive the bonus value for a candidate media budget.
pub fn bonification(active: bool, negotiated_value: Decimal, media_budget: Decimal) -> Bonification {
    if !active {
        return Bonification {
            negotiated_value: Decimal::ZERO,
            bonus_value: Decimal::ZERO,
            status: BonusStatus::Inactive,
        };
    }

    if negotiated_value.is_zero() {
        return Bonification {
            negotiated_value,
            bonus_value: Decimal::ZERO,
            status: BonusStatus::Pending,
        };
    }

    if negotiated_value < media_budget {
        return Bonification {
            negotiated_value,
            bonus_value: Decimal::ZERO,
            status: BonusStatus::BelowMedia,
        };
    }

    Bonification {
        negotiated_value,
        bonus_value: negotiated_value - media_budget,
        status: BonusStatus::Applied,
    }
}
