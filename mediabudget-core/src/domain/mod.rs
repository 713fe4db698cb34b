//! Domain types for the budget engine

pub mod fee;
pub mod ids;
pub mod snapshot;
pub mod unit_type;

pub use fee::{CalculationMode, CalculationType, ClientFee, FeeOption};
pub use ids::{CurrencyCode, FeeId, OptionId, UnitTypeId};
pub use snapshot::{
    BudgetMode, BudgetSnapshot, FeeOverrides, FeeSelection, FeeSlot, ReferenceTotals,
    SelectedOption, FEE_SLOT_COUNT,
};
pub use unit_type::{find_unit_type, PricingBasis, UnitType};

use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Currency code → multiplier against the rate provider's base currency.
pub type RateTable = BTreeMap<CurrencyCode, Decimal>;
