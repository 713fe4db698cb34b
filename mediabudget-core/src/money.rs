//! Checked decimal arithmetic.
//!
//! `Decimal` operators panic on overflow. Engine code goes through these
//! helpers so that absurd inputs surface as `CalculationError::Overflow`.

use rust_decimal::Decimal;

use crate::engine::CalculationError;

pub fn add(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal, CalculationError> {
    a.checked_add(b).ok_or(CalculationError::Overflow { operation })
}

pub fn sub(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal, CalculationError> {
    a.checked_sub(b).ok_or(CalculationError::Overflow { operation })
}

pub fn mul(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal, CalculationError> {
    a.checked_mul(b).ok_or(CalculationError::Overflow { operation })
}

/// Division; callers guard against a zero divisor.
pub fn div(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal, CalculationError> {
    a.checked_div(b).ok_or(CalculationError::Overflow { operation })
}

pub fn sum<I>(values: I, operation: &'static str) -> Result<Decimal, CalculationError>
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().try_fold(Decimal::ZERO, |acc, v| add(acc, v, operation))
}
