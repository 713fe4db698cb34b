//! Client fee configuration: the read-only input describing the agency fees
//! a client is charged and how each one is computed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{FeeId, OptionId};

/// How a fee's amount is derived from its adjusted option value.
///
/// Unknown names in a configuration deserialize to `Unrecognized` so that the
/// engine can report the configuration defect instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationType {
    /// Fraction of the media budget or of the cascaded base (0.05 = 5%).
    PercentOfBudget,
    /// Price per unit multiplied by the purchased (or overridden) volume.
    PerUnitVolume,
    /// Price per unit multiplied by a user supplied count (default 1).
    PerUnitCount,
    /// Flat amount, independent of budget and volume.
    FixedAmount,
    #[serde(other)]
    Unrecognized,
}

/// Which base a percentage fee applies to, and whether the fee feeds the
/// cumulative base seen by later fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMode {
    DirectOnMediaBudget,
    OnCascadedBase,
    #[serde(other)]
    Unrecognized,
}

impl CalculationMode {
    pub fn is_cascaded(self) -> bool {
        matches!(self, Self::OnCascadedBase)
    }
}

/// One selectable value for a fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeOption {
    pub id: OptionId,
    pub base_value: Decimal,
    /// Markup (positive) or markdown (negative) in percent, applied before the formula.
    #[serde(default)]
    pub buffer_percent: Decimal,
    /// Whether the user may replace `base_value` with a custom override.
    #[serde(default)]
    pub editable: bool,
}

impl FeeOption {
    pub fn new(id: impl Into<String>, base_value: Decimal) -> Self {
        Self {
            id: OptionId::new(id),
            base_value,
            buffer_percent: Decimal::ZERO,
            editable: false,
        }
    }

    pub fn with_buffer(mut self, buffer_percent: Decimal) -> Self {
        self.buffer_percent = buffer_percent;
        self
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }
}

/// A fee configured for a client. `order` defines the cascade sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFee {
    pub id: FeeId,
    pub order: u32,
    pub calculation_type: CalculationType,
    pub calculation_mode: CalculationMode,
    #[serde(default)]
    pub options: Vec<FeeOption>,
}

impl ClientFee {
    pub fn new(
        id: impl Into<String>,
        order: u32,
        calculation_type: CalculationType,
        calculation_mode: CalculationMode,
    ) -> Self {
        Self {
            id: FeeId::new(id),
            order,
            calculation_type,
            calculation_mode,
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, option: FeeOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn option(&self, id: &OptionId) -> Option<&FeeOption> {
        self.options.iter().find(|o| &o.id == id)
    }
}
