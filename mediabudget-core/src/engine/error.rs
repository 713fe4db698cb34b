//! Fatal calculation errors.
//!
//! Anything here aborts the calculation; the caller must not apply a partial
//! result. Recoverable conditions are `Advisory` values in the report instead.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{FeeId, OptionId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculationError {
    #[error("fee '{fee_id}' has an unrecognized calculation type")]
    UnrecognizedCalculationType { fee_id: FeeId },

    #[error("fee '{fee_id}' has an unrecognized calculation mode")]
    UnrecognizedCalculationMode { fee_id: FeeId },

    #[error("{count} fees configured, at most {max} are supported")]
    TooManyFees { count: usize, max: usize },

    #[error("fees '{first}' and '{second}' share cascade order {order}")]
    DuplicateOrder { order: u32, first: FeeId, second: FeeId },

    #[error("fee '{fee_id}' defines no options")]
    NoOptions { fee_id: FeeId },

    #[error("fee '{fee_id}' defines option '{option_id}' more than once")]
    DuplicateOption { fee_id: FeeId, option_id: OptionId },

    #[error("fee '{fee_id}' option '{option_id}' has buffer {buffer_percent}%, must be above -100%")]
    InvalidBuffer { fee_id: FeeId, option_id: OptionId, buffer_percent: Decimal },

    #[error("fee slot {slot_number} selects option '{option_id}' which fee '{fee_id}' does not define")]
    UnknownOption { slot_number: usize, fee_id: FeeId, option_id: OptionId },

    #[error("fee slot {slot_number} is active but no fee is configured for it")]
    UnboundSlot { slot_number: usize },

    #[error("{field} must not be negative, got {value}")]
    NegativeInput { field: &'static str, value: Decimal },

    #[error("arithmetic overflow while computing {operation}")]
    Overflow { operation: &'static str },
}

impl CalculationError {
    /// True for defects in the fee configuration itself (as opposed to the snapshot).
    pub fn is_configuration_defect(&self) -> bool {
        matches!(
            self,
            Self::UnrecognizedCalculationType { .. }
                | Self::UnrecognizedCalculationMode { .. }
                | Self::TooManyFees { .. }
                | Self::DuplicateOrder { .. }
                | Self::NoOptions { .. }
                | Self::DuplicateOption { .. }
                | Self::InvalidBuffer { .. }
        )
    }
}
