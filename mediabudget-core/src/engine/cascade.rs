//! Fee cascade calculator.
//!
//! Evaluates the five fee slots strictly in cascade order, threading a
//! cumulative base that starts at the media budget and grows by every priced
//! fee. Percentage fees in `OnCascadedBase` mode apply to that running base,
//! so they see exactly the fees with a smaller order; `DirectOnMediaBudget`
//! fees apply to the media budget alone.
//!
//! The cascade is inherently sequential; never evaluate slots in parallel.

use rust_decimal::Decimal;
use tracing::{trace, warn};

use crate::domain::{
    CalculationMode, CalculationType, ClientFee, FeeId, FeeOption, FeeOverrides, FeeSelection,
    FeeSlot, FEE_SLOT_COUNT,
};
use crate::engine::report::{FeeOutcome, PendingReason};
use crate::engine::volume::UnitVolume;
use crate::engine::CalculationError;
use crate::money;
use crate::options::Verbosity;

/// Fees bound to slot positions (slot `i` ↔ the `i`-th fee by ascending order).
pub type BoundFees<'a> = [Option<&'a ClientFee>; FEE_SLOT_COUNT];

/// Inputs for one cascade evaluation.
#[derive(Debug, Clone, Copy)]
pub struct CascadeInput<'a> {
    pub media_budget: Decimal,
    pub volume: UnitVolume,
    pub slots: &'a [FeeSlot; FEE_SLOT_COUNT],
    pub fees: &'a BoundFees<'a>,
    pub verbosity: Verbosity,
}

/// Result of one cascade evaluation, at full precision.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeResult {
    pub values: [Decimal; FEE_SLOT_COUNT],
    pub outcomes: [FeeOutcome; FEE_SLOT_COUNT],
    pub total: Decimal,
    /// Media budget plus every priced fee.
    pub cumulative_base: Decimal,
    /// Slots whose overrides were ignored because the option is not editable.
    pub ignored_overrides: Vec<(usize, FeeId)>,
    /// Fees whose type or mode the engine does not know; they contributed 0.
    pub unrecognized: Vec<FeeId>,
}

/// `base × (1 + buffer_percent / 100)`.
pub fn apply_buffer(base_value: Decimal, buffer_percent: Decimal) -> Result<Decimal, CalculationError> {
    if buffer_percent.is_zero() {
        return Ok(base_value);
    }
    let factor = Decimal::ONE + money::div(buffer_percent, Decimal::ONE_HUNDRED, "fee buffer")?;
    money::mul(base_value, factor, "buffered fee value")
}

/// Evaluate all slots in order.
pub fn run_cascade(input: &CascadeInput<'_>) -> Result<CascadeResult, CalculationError> {
    let mut result = CascadeResult {
        values: [Decimal::ZERO; FEE_SLOT_COUNT],
        outcomes: [FeeOutcome::Disabled; FEE_SLOT_COUNT],
        total: Decimal::ZERO,
        cumulative_base: input.media_budget,
        ignored_overrides: Vec::new(),
        unrecognized: Vec::new(),
    };

    for (index, slot) in input.slots.iter().enumerate() {
        let fee = match input.fees[index] {
            Some(fee) => fee,
            None if slot.selection.is_active() => {
                return Err(CalculationError::UnboundSlot { slot_number: index + 1 });
            }
            None => continue,
        };

        let selected = match &slot.selection {
            FeeSelection::Inactive => continue,
            FeeSelection::ActiveUnselected => {
                result.outcomes[index] =
                    FeeOutcome::Pending { reason: PendingReason::NoOptionSelected };
                continue;
            }
            FeeSelection::Selected(selected) => selected,
        };

        let option = fee.option(&selected.option_id).ok_or_else(|| CalculationError::UnknownOption {
            slot_number: index + 1,
            fee_id: fee.id.clone(),
            option_id: selected.option_id.clone(),
        })?;

        if !option.editable && (selected.overrides.value.is_some() || selected.overrides.volume.is_some()) {
            result.ignored_overrides.push((index, fee.id.clone()));
        }

        let (amount, outcome) =
            evaluate_fee(fee, option, &selected.overrides, input, result.cumulative_base, &mut result.unrecognized)?;

        result.cumulative_base = money::add(result.cumulative_base, amount, "cascaded base")?;

        if input.verbosity.trace() {
            trace!(
                slot = index + 1,
                fee = %fee.id,
                option = %option.id,
                amount = %amount,
                cumulative_base = %result.cumulative_base,
                "fee evaluated"
            );
        }

        result.values[index] = amount;
        result.outcomes[index] = outcome;
        result.total = money::add(result.total, amount, "fee total")?;
    }

    Ok(result)
}

fn evaluate_fee(
    fee: &ClientFee,
    option: &FeeOption,
    overrides: &FeeOverrides,
    input: &CascadeInput<'_>,
    cumulative_base: Decimal,
    unrecognized: &mut Vec<FeeId>,
) -> Result<(Decimal, FeeOutcome), CalculationError> {
    let base_value = match overrides.value {
        Some(custom) if option.editable => custom,
        _ => option.base_value,
    };
    let adjusted = apply_buffer(base_value, option.buffer_percent)?;

    let amount = match fee.calculation_type {
        CalculationType::PercentOfBudget => {
            let base = match fee.calculation_mode {
                CalculationMode::OnCascadedBase => cumulative_base,
                CalculationMode::DirectOnMediaBudget => input.media_budget,
                CalculationMode::Unrecognized => {
                    note_unrecognized(fee, input.verbosity, unrecognized);
                    input.media_budget
                }
            };
            money::mul(adjusted, base, "percentage fee")?
        }
        CalculationType::PerUnitVolume => {
            let volume = match overrides.volume {
                Some(custom) if option.editable && custom > Decimal::ZERO => custom,
                _ => input.volume.value,
            };
            if volume.is_zero() {
                let outcome = FeeOutcome::Pending { reason: PendingReason::VolumeUndetermined };
                return Ok((Decimal::ZERO, outcome));
            }
            money::mul(adjusted, volume, "per-unit-volume fee")?
        }
        CalculationType::PerUnitCount => {
            let count = overrides.unit_count.unwrap_or(Decimal::ONE);
            money::mul(adjusted, count, "per-unit-count fee")?
        }
        CalculationType::FixedAmount => adjusted,
        CalculationType::Unrecognized => {
            note_unrecognized(fee, input.verbosity, unrecognized);
            Decimal::ZERO
        }
    };

    Ok((amount, FeeOutcome::Computed { value: amount }))
}

fn note_unrecognized(fee: &ClientFee, verbosity: Verbosity, unrecognized: &mut Vec<FeeId>) {
    if verbosity.warnings() {
        warn!(fee = %fee.id, "unrecognized fee calculation, contributing 0");
    }
    if !unrecognized.contains(&fee.id) {
        unrecognized.push(fee.id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::volume::VolumeStatus;
    use rust_decimal_macros::dec;

    fn percent_fee(id: &str, order: u32, mode: CalculationMode, value: Decimal) -> ClientFee {
        ClientFee::new(id, order, CalculationType::PercentOfBudget, mode)
            .with_option(FeeOption::new("std", value))
    }

    fn volume(value: Decimal) -> UnitVolume {
        UnitVolume { value, status: VolumeStatus::Determined }
    }

    fn slots_with(selections: &[(usize, FeeSelection)]) -> [FeeSlot; FEE_SLOT_COUNT] {
        let mut slots: [FeeSlot; FEE_SLOT_COUNT] = Default::default();
        for (i, sel) in selections {
            slots[*i].selection = sel.clone();
        }
        slots
    }

    fn run(
        media: Decimal,
        vol: UnitVolume,
        slots: &[FeeSlot; FEE_SLOT_COUNT],
        fees: &[ClientFee],
    ) -> Result<CascadeResult, CalculationError> {
        let mut bound: BoundFees<'_> = [None; FEE_SLOT_COUNT];
        for (i, fee) in fees.iter().enumerate() {
            bound[i] = Some(fee);
        }
        run_cascade(&CascadeInput {
            media_budget: media,
            volume: vol,
            slots,
            fees: &bound,
            verbosity: Verbosity::Quiet,
        })
    }

    #[test]
    fn direct_then_cascaded_percentages() {
        let fees = vec![
            percent_fee("agency", 1, CalculationMode::DirectOnMediaBudget, dec!(0.10)),
            percent_fee("tech", 2, CalculationMode::OnCascadedBase, dec!(0.10)),
        ];
        let slots = slots_with(&[(0, FeeSelection::selected("std")), (1, FeeSelection::selected("std"))]);

        let res = run(dec!(1000), volume(Decimal::ZERO), &slots, &fees).unwrap();
        assert_eq!(res.values[0], dec!(100));
        assert_eq!(res.values[1], dec!(110));
        assert_eq!(res.total, dec!(210));
        assert_eq!(res.cumulative_base, dec!(1210));
    }

    #[test]
    fn direct_fee_ignores_earlier_fees() {
        let fees = vec![
            percent_fee("a", 1, CalculationMode::OnCascadedBase, dec!(0.10)),
            percent_fee("b", 2, CalculationMode::DirectOnMediaBudget, dec!(0.10)),
        ];
        let slots = slots_with(&[(0, FeeSelection::selected("std")), (1, FeeSelection::selected("std"))]);

        let res = run(dec!(1000), volume(Decimal::ZERO), &slots, &fees).unwrap();
        assert_eq!(res.values[0], dec!(100));
        assert_eq!(res.values[1], dec!(100));
        assert_eq!(res.cumulative_base, dec!(1200));
    }

    #[test]
    fn cascaded_fees_compound() {
        let fees = vec![
            percent_fee("a", 1, CalculationMode::OnCascadedBase, dec!(0.10)),
            percent_fee("b", 2, CalculationMode::OnCascadedBase, dec!(0.10)),
        ];
        let slots = slots_with(&[(0, FeeSelection::selected("std")), (1, FeeSelection::selected("std"))]);

        let res = run(dec!(1000), volume(Decimal::ZERO), &slots, &fees).unwrap();
        assert_eq!(res.values[0], dec!(100));
        assert_eq!(res.values[1], dec!(110));
        assert_eq!(res.total, dec!(210));
    }

    #[test]
    fn inactive_and_unselected_are_distinguished() {
        let fees = vec![
            percent_fee("a", 1, CalculationMode::DirectOnMediaBudget, dec!(0.10)),
            percent_fee("b", 2, CalculationMode::DirectOnMediaBudget, dec!(0.10)),
        ];
        let slots = slots_with(&[(1, FeeSelection::ActiveUnselected)]);

        let res = run(dec!(1000), volume(Decimal::ZERO), &slots, &fees).unwrap();
        assert_eq!(res.total, Decimal::ZERO);
        assert_eq!(res.outcomes[0], FeeOutcome::Disabled);
        assert_eq!(
            res.outcomes[1],
            FeeOutcome::Pending { reason: PendingReason::NoOptionSelected }
        );
    }

    #[test]
    fn buffer_is_applied_before_formula() {
        let fees = vec![ClientFee::new(
            "ops",
            1,
            CalculationType::FixedAmount,
            CalculationMode::DirectOnMediaBudget,
        )
        .with_option(FeeOption::new("std", dec!(200)).with_buffer(dec!(10)))];
        let slots = slots_with(&[(0, FeeSelection::selected("std"))]);

        let res = run(dec!(5000), volume(Decimal::ZERO), &slots, &fees).unwrap();
        assert_eq!(res.values[0], dec!(220));
    }

    #[test]
    fn editable_override_replaces_base_value() {
        let fees = vec![ClientFee::new(
            "agency",
            1,
            CalculationType::PercentOfBudget,
            CalculationMode::DirectOnMediaBudget,
        )
        .with_option(FeeOption::new("custom", dec!(0.10)).editable())];
        let overrides = FeeOverrides { value: Some(dec!(0.07)), ..Default::default() };
        let slots = slots_with(&[(0, FeeSelection::selected_with("custom", overrides))]);

        let res = run(dec!(1000), volume(Decimal::ZERO), &slots, &fees).unwrap();
        assert_eq!(res.values[0], dec!(70));
        assert!(res.ignored_overrides.is_empty());
    }

    #[test]
    fn override_on_locked_option_is_ignored_and_reported() {
        let fees = vec![percent_fee("agency", 1, CalculationMode::DirectOnMediaBudget, dec!(0.10))];
        let overrides = FeeOverrides { value: Some(dec!(0.50)), ..Default::default() };
        let slots = slots_with(&[(0, FeeSelection::selected_with("std", overrides))]);

        let res = run(dec!(1000), volume(Decimal::ZERO), &slots, &fees).unwrap();
        assert_eq!(res.values[0], dec!(100));
        assert_eq!(res.ignored_overrides, vec![(0, FeeId::new("agency"))]);
    }

    #[test]
    fn per_unit_volume_uses_computed_volume() {
        let fees = vec![ClientFee::new(
            "adserving",
            1,
            CalculationType::PerUnitVolume,
            CalculationMode::DirectOnMediaBudget,
        )
        .with_option(FeeOption::new("std", dec!(0.002)))];
        let slots = slots_with(&[(0, FeeSelection::selected("std"))]);

        let res = run(dec!(1000), volume(dec!(200000)), &slots, &fees).unwrap();
        assert_eq!(res.values[0], dec!(400));
    }

    #[test]
    fn per_unit_volume_override_needs_positive_value() {
        let fee = ClientFee::new(
            "adserving",
            1,
            CalculationType::PerUnitVolume,
            CalculationMode::DirectOnMediaBudget,
        )
        .with_option(FeeOption::new("custom", dec!(0.01)).editable());
        let fees = vec![fee];

        let positive = FeeOverrides { volume: Some(dec!(5000)), ..Default::default() };
        let slots = slots_with(&[(0, FeeSelection::selected_with("custom", positive))]);
        let res = run(dec!(1000), volume(dec!(100)), &slots, &fees).unwrap();
        assert_eq!(res.values[0], dec!(50));

        let zero = FeeOverrides { volume: Some(Decimal::ZERO), ..Default::default() };
        let slots = slots_with(&[(0, FeeSelection::selected_with("custom", zero))]);
        let res = run(dec!(1000), volume(dec!(100)), &slots, &fees).unwrap();
        assert_eq!(res.values[0], dec!(1));
    }

    #[test]
    fn per_unit_volume_with_no_volume_is_pending() {
        let fees = vec![ClientFee::new(
            "adserving",
            1,
            CalculationType::PerUnitVolume,
            CalculationMode::OnCascadedBase,
        )
        .with_option(FeeOption::new("std", dec!(0.002)))];
        let slots = slots_with(&[(0, FeeSelection::selected("std"))]);

        let res = run(dec!(1000), UnitVolume::undetermined(), &slots, &fees).unwrap();
        assert_eq!(res.values[0], Decimal::ZERO);
        assert_eq!(
            res.outcomes[0],
            FeeOutcome::Pending { reason: PendingReason::VolumeUndetermined }
        );
        assert!(res.outcomes[0].is_active());
        assert_eq!(res.cumulative_base, dec!(1000));
    }

    #[test]
    fn per_unit_count_defaults_to_one() {
        let fee = ClientFee::new(
            "creative",
            1,
            CalculationType::PerUnitCount,
            CalculationMode::DirectOnMediaBudget,
        )
        .with_option(FeeOption::new("std", dec!(150)));
        let fees = vec![fee];

        let slots = slots_with(&[(0, FeeSelection::selected("std"))]);
        let res = run(dec!(1000), volume(Decimal::ZERO), &slots, &fees).unwrap();
        assert_eq!(res.values[0], dec!(150));

        let counted = FeeOverrides { unit_count: Some(dec!(4)), ..Default::default() };
        let slots = slots_with(&[(0, FeeSelection::selected_with("std", counted))]);
        let res = run(dec!(1000), volume(Decimal::ZERO), &slots, &fees).unwrap();
        assert_eq!(res.values[0], dec!(600));
    }

    #[test]
    fn fixed_amount_ignores_volume_and_budget() {
        let fees = vec![ClientFee::new(
            "setup",
            1,
            CalculationType::FixedAmount,
            CalculationMode::OnCascadedBase,
        )
        .with_option(FeeOption::new("std", dec!(300)))];
        let slots = slots_with(&[(0, FeeSelection::selected("std"))]);

        let small = run(dec!(10), volume(dec!(1)), &slots, &fees).unwrap();
        let large = run(dec!(10000), volume(dec!(99999)), &slots, &fees).unwrap();
        assert_eq!(small.values[0], dec!(300));
        assert_eq!(large.values[0], dec!(300));
        assert_eq!(large.cumulative_base, dec!(10300));
    }

    #[test]
    fn unrecognized_type_contributes_zero_and_is_recorded() {
        let fees = vec![ClientFee::new(
            "mystery",
            1,
            CalculationType::Unrecognized,
            CalculationMode::DirectOnMediaBudget,
        )
        .with_option(FeeOption::new("std", dec!(0.10)))];
        let slots = slots_with(&[(0, FeeSelection::selected("std"))]);

        let res = run(dec!(1000), volume(Decimal::ZERO), &slots, &fees).unwrap();
        assert_eq!(res.total, Decimal::ZERO);
        assert_eq!(res.unrecognized, vec![FeeId::new("mystery")]);
    }

    #[test]
    fn unknown_option_is_fatal() {
        let fees = vec![percent_fee("agency", 1, CalculationMode::DirectOnMediaBudget, dec!(0.10))];
        let slots = slots_with(&[(0, FeeSelection::selected("gone"))]);

        let err = run(dec!(1000), volume(Decimal::ZERO), &slots, &fees).unwrap_err();
        assert!(matches!(err, CalculationError::UnknownOption { slot_number: 1, .. }));
    }

    #[test]
    fn active_slot_without_fee_is_fatal() {
        let slots = slots_with(&[(3, FeeSelection::ActiveUnselected)]);
        let err = run(dec!(1000), volume(Decimal::ZERO), &slots, &[]).unwrap_err();
        assert_eq!(err, CalculationError::UnboundSlot { slot_number: 4 });
    }

    #[test]
    fn negative_buffer_is_a_markdown() {
        assert_eq!(apply_buffer(dec!(100), dec!(-25)).unwrap(), dec!(75));
        assert_eq!(apply_buffer(dec!(0.10), Decimal::ZERO).unwrap(), dec!(0.10));
    }
}
