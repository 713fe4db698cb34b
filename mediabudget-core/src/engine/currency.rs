//! Currency resolver — buy currency → reference currency multiplier.
//!
//! Rate table entries are multipliers against the provider's base currency.
//! The reference currency is usually that base and therefore absent from the
//! table; an absent reference entry counts as 1.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{CurrencyCode, RateTable};
use crate::engine::CalculationError;
use crate::money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateStatus {
    /// Buy and reference currency are the same.
    SameCurrency,
    /// A rate was found and applied.
    Converted,
    /// No usable rate; multiplier defaulted to 1.
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyResolution {
    pub rate: Decimal,
    pub status: RateStatus,
}

impl CurrencyResolution {
    fn unconverted(status: RateStatus) -> Self {
        Self { rate: Decimal::ONE, status }
    }

    pub fn is_missing(&self) -> bool {
        self.status == RateStatus::Missing
    }
}

/// Resolve the multiplier that converts buy-currency amounts to the reference currency.
///
/// Never fails for missing data: an absent or non-positive rate yields 1 with
/// `RateStatus::Missing`. Only arithmetic overflow is an error.
pub fn resolve_rate(
    buy: &CurrencyCode,
    reference: &CurrencyCode,
    rates: &RateTable,
) -> Result<CurrencyResolution, CalculationError> {
    if buy == reference {
        return Ok(CurrencyResolution::unconverted(RateStatus::SameCurrency));
    }

    let buy_rate = match rates.get(buy) {
        Some(rate) if *rate > Decimal::ZERO => *rate,
        _ => return Ok(CurrencyResolution::unconverted(RateStatus::Missing)),
    };

    let reference_rate = match rates.get(reference) {
        None => Decimal::ONE,
        Some(rate) if *rate > Decimal::ZERO => *rate,
        Some(_) => return Ok(CurrencyResolution::unconverted(RateStatus::Missing)),
    };

    let rate = money::div(buy_rate, reference_rate, "currency cross rate")?;
    Ok(CurrencyResolution { rate, status: RateStatus::Converted })
}
