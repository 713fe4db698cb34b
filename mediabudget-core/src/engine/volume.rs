//! Unit volume calculator.
//!
//! `volume = effective_budget / unit_price`, ×1000 for per-mille pricing.
//! A zero unit price leaves the volume undetermined; downstream per-unit fees
//! treat that as pending input, never as a user-entered zero.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::PricingBasis;
use crate::engine::CalculationError;
use crate::money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeStatus {
    Determined,
    /// No unit price yet; value is 0.
    Undetermined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitVolume {
    pub value: Decimal,
    pub status: VolumeStatus,
}

impl UnitVolume {
    pub fn undetermined() -> Self {
        Self { value: Decimal::ZERO, status: VolumeStatus::Undetermined }
    }

    pub fn is_determined(&self) -> bool {
        self.status == VolumeStatus::Determined
    }
}

/// Compute the purchased unit volume.
///
/// `effective_budget` is media budget plus bonus value.
pub fn unit_volume(
    effective_budget: Decimal,
    unit_price: Decimal,
    pricing: PricingBasis,
) -> Result<UnitVolume, CalculationError> {
    if unit_price <= Decimal::ZERO {
        return Ok(UnitVolume::undetermined());
    }

    let units = money::div(effective_budget, unit_price, "unit volume")?;
    let value = match pricing {
        PricingBasis::PerUnit => units,
        PricingBasis::PerMille => {
            money::mul(units, Decimal::from(pricing.multiplier()), "per-mille unit volume")?
        }
    };

    Ok(UnitVolume { value, status: VolumeStatus::Determined })
}
