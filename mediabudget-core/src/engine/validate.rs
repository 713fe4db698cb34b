//! Fee configuration and snapshot validation.
//!
//! Every defect found here is fatal: the configuration or snapshot cannot be
//! calculated without guessing.

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::domain::{
    BudgetSnapshot, CalculationMode, CalculationType, ClientFee, FeeSelection, FEE_SLOT_COUNT,
};
use crate::engine::cascade::BoundFees;
use crate::engine::CalculationError;

/// Check a fee configuration on its own.
pub fn validate_fees(fees: &[ClientFee]) -> Result<(), CalculationError> {
    if fees.len() > FEE_SLOT_COUNT {
        return Err(CalculationError::TooManyFees { count: fees.len(), max: FEE_SLOT_COUNT });
    }

    for fee in fees {
        if fee.calculation_type == CalculationType::Unrecognized {
            return Err(CalculationError::UnrecognizedCalculationType { fee_id: fee.id.clone() });
        }
        if fee.calculation_mode == CalculationMode::Unrecognized {
            return Err(CalculationError::UnrecognizedCalculationMode { fee_id: fee.id.clone() });
        }
        if fee.options.is_empty() {
            return Err(CalculationError::NoOptions { fee_id: fee.id.clone() });
        }

        let mut seen = HashSet::new();
        for option in &fee.options {
            if !seen.insert(&option.id) {
                return Err(CalculationError::DuplicateOption {
                    fee_id: fee.id.clone(),
                    option_id: option.id.clone(),
                });
            }
            if option.buffer_percent <= -Decimal::ONE_HUNDRED {
                return Err(CalculationError::InvalidBuffer {
                    fee_id: fee.id.clone(),
                    option_id: option.id.clone(),
                    buffer_percent: option.buffer_percent,
                });
            }
        }
    }

    let sorted = sorted_by_order(fees);
    for pair in sorted.windows(2) {
        if pair[0].order == pair[1].order {
            return Err(CalculationError::DuplicateOrder {
                order: pair[0].order,
                first: pair[0].id.clone(),
                second: pair[1].id.clone(),
            });
        }
    }

    Ok(())
}

/// Validate the configuration and bind fees to slots by ascending `order`.
pub fn bind_fees(fees: &[ClientFee]) -> Result<BoundFees<'_>, CalculationError> {
    validate_fees(fees)?;
    let mut bound: BoundFees<'_> = [None; FEE_SLOT_COUNT];
    for (slot, fee) in sorted_by_order(fees).into_iter().enumerate() {
        bound[slot] = Some(fee);
    }
    Ok(bound)
}

/// Check snapshot inputs against the bound configuration.
pub fn validate_snapshot(snapshot: &BudgetSnapshot, bound: &BoundFees<'_>) -> Result<(), CalculationError> {
    non_negative("budget_input", snapshot.budget_input)?;
    non_negative("unit_price", snapshot.unit_price)?;
    if snapshot.bonus_active {
        non_negative("negotiated_value", snapshot.negotiated_value)?;
    }

    for (index, slot) in snapshot.fees.iter().enumerate() {
        let fee = match (bound[index], &slot.selection) {
            (_, FeeSelection::Inactive) => continue,
            (None, _) => return Err(CalculationError::UnboundSlot { slot_number: index + 1 }),
            (Some(fee), _) => fee,
        };

        if let FeeSelection::Selected(selected) = &slot.selection {
            if fee.option(&selected.option_id).is_none() {
                return Err(CalculationError::UnknownOption {
                    slot_number: index + 1,
                    fee_id: fee.id.clone(),
                    option_id: selected.option_id.clone(),
                });
            }
            let overrides = &selected.overrides;
            if let Some(value) = overrides.value {
                non_negative("fee value override", value)?;
            }
            if let Some(volume) = overrides.volume {
                non_negative("fee volume override", volume)?;
            }
            if let Some(count) = overrides.unit_count {
                non_negative("fee unit count", count)?;
            }
        }
    }

    Ok(())
}

fn sorted_by_order(fees: &[ClientFee]) -> Vec<&ClientFee> {
    let mut sorted: Vec<&ClientFee> = fees.iter().collect();
    sorted.sort_by_key(|f| f.order);
    sorted
}

fn non_negative(field: &'static str, value: Decimal) -> Result<(), CalculationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CalculationError::NegativeInput { field, value });
    }
    Ok(())
}
