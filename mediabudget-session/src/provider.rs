//! Collaborator seams: where fee configuration and exchange rates come from.
//!
//! The engine only ever sees plain slices and maps through a
//! `CalculationContext`; these traits let a session be backed by a scenario
//! file, a fixture, or anything else that can hand those out.

use mediabudget_core::domain::{ClientFee, CurrencyCode, RateTable, UnitType};
use mediabudget_core::engine::CalculationContext;

/// Source of the tactic's fee configuration and unit type catalog.
pub trait FeeConfigProvider {
    fn fees(&self) -> &[ClientFee];

    fn unit_types(&self) -> &[UnitType] {
        &[]
    }
}

/// Source of exchange rates and the reference currency they convert into.
pub trait RateProvider {
    fn rates(&self) -> &RateTable;

    fn reference_currency(&self) -> &CurrencyCode;
}

impl<T: FeeConfigProvider + ?Sized> FeeConfigProvider for &T {
    fn fees(&self) -> &[ClientFee] {
        (**self).fees()
    }

    fn unit_types(&self) -> &[UnitType] {
        (**self).unit_types()
    }
}

impl<T: RateProvider + ?Sized> RateProvider for &T {
    fn rates(&self) -> &RateTable {
        (**self).rates()
    }

    fn reference_currency(&self) -> &CurrencyCode {
        (**self).reference_currency()
    }
}

/// Build an engine context from a pair of providers.
pub fn context<'a>(
    fees: &'a dyn FeeConfigProvider,
    rates: &'a dyn RateProvider,
) -> CalculationContext<'a> {
    CalculationContext {
        fees: fees.fees(),
        rates: rates.rates(),
        reference_currency: rates.reference_currency(),
        unit_types: fees.unit_types(),
    }
}

/// Fixed in-memory configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticConfig {
    pub fees: Vec<ClientFee>,
    pub unit_types: Vec<UnitType>,
    pub rates: RateTable,
    pub reference_currency: CurrencyCode,
}

impl StaticConfig {
    pub fn new(reference_currency: impl Into<String>) -> Self {
        Self { reference_currency: CurrencyCode::new(reference_currency), ..Self::default() }
    }

    pub fn with_fee(mut self, fee: ClientFee) -> Self {
        self.fees.push(fee);
        self
    }

    pub fn with_unit_type(mut self, unit_type: UnitType) -> Self {
        self.unit_types.push(unit_type);
        self
    }

    pub fn with_rate(mut self, currency: impl Into<String>, rate: rust_decimal::Decimal) -> Self {
        self.rates.insert(CurrencyCode::new(currency), rate);
        self
    }
}

impl FeeConfigProvider for StaticConfig {
    fn fees(&self) -> &[ClientFee] {
        &self.fees
    }

    fn unit_types(&self) -> &[UnitType] {
        &self.unit_types
    }
}

impl RateProvider for StaticConfig {
    fn rates(&self) -> &RateTable {
        &self.rates
    }

    fn reference_currency(&self) -> &CurrencyCode {
        &self.reference_currency
    }
}
