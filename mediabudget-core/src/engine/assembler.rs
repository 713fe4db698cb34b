//! Result assembler — the only place where rounding happens.
//!
//! The stored media budget sits on the money grid and every other stored
//! figure is derived from it: bonus, volume and fees are re-evaluated at the
//! stored media, each fee is rounded individually, and the client total is
//! `media + Σ fees`. In converged client-total mode the grid point whose
//! client total lands closest to the target is chosen; when two are equally
//! close the one not exceeding the target wins.

use rust_decimal::Decimal;

use crate::domain::{BudgetMode, BudgetSnapshot, CurrencyCode, ReferenceTotals, FEE_SLOT_COUNT};
use crate::engine::currency::CurrencyResolution;
use crate::engine::solver::{Evaluation, Evaluator, Solution};
use crate::engine::CalculationError;
use crate::money;
use crate::options::RoundingPolicy;

/// Grid steps walked either way from the solver candidate. Bisection stops
/// within tolerance of the root, so the crossing is at most a step or two away.
const MAX_GRID_STEPS: u32 = 16;

/// Rounded figures ready to be written into a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledTotals {
    pub media_budget: Decimal,
    pub client_budget: Decimal,
    pub fees: [Decimal; FEE_SLOT_COUNT],
    pub bonus_value: Decimal,
    pub negotiated_value: Decimal,
    pub unit_volume: Decimal,
    pub reference_totals: Option<ReferenceTotals>,
}

/// Move the solver's full-precision media budget onto the money grid and
/// re-evaluate bonus, volume and fees there.
pub fn settle(
    mode: BudgetMode,
    budget_input: Decimal,
    solution: &Solution,
    evaluator: &Evaluator<'_>,
    rounding: &RoundingPolicy,
) -> Result<Evaluation, CalculationError> {
    let eval = &solution.evaluation;
    if mode == BudgetMode::ClientTotal && solution.convergence.has_converged {
        return settle_on_target(rounding.money(budget_input), eval.media_budget, evaluator, rounding);
    }
    let media = rounding.money(eval.media_budget).max(Decimal::ZERO);
    if media == eval.media_budget {
        Ok(eval.clone())
    } else {
        evaluator.evaluate(media)
    }
}

fn settle_on_target(
    target: Decimal,
    candidate: Decimal,
    evaluator: &Evaluator<'_>,
    rounding: &RoundingPolicy,
) -> Result<Evaluation, CalculationError> {
    let step = rounding.money_step();

    // Highest grid point whose client total does not exceed the target.
    let mut low = evaluator.evaluate(rounding.money_floor(candidate).max(Decimal::ZERO))?;
    let mut walked = 0;
    while walked < MAX_GRID_STEPS && low.media_budget > Decimal::ZERO && rounded_client(&low, rounding)? > target {
        let media = money::sub(low.media_budget, step, "settled media budget")?.max(Decimal::ZERO);
        low = evaluator.evaluate(media)?;
        walked += 1;
    }
    let mut high = evaluator.evaluate(money::add(low.media_budget, step, "settled media budget")?)?;
    walked = 0;
    while walked < MAX_GRID_STEPS && rounded_client(&high, rounding)? <= target {
        let media = money::add(high.media_budget, step, "settled media budget")?;
        low = std::mem::replace(&mut high, evaluator.evaluate(media)?);
        walked += 1;
    }

    let low_gap = money::sub(rounded_client(&low, rounding)?, target, "settled gap")?.abs();
    let high_gap = money::sub(rounded_client(&high, rounding)?, target, "settled gap")?.abs();
    Ok(if high_gap < low_gap { high } else { low })
}

/// Client total as it will be stored: media plus individually rounded fees.
fn rounded_client(eval: &Evaluation, rounding: &RoundingPolicy) -> Result<Decimal, CalculationError> {
    let fees = money::sum(eval.cascade.values.iter().map(|v| rounding.money(*v)), "rounded fee total")?;
    money::add(rounding.money(eval.media_budget), fees, "client budget")
}

/// Round a settled evaluation and reconcile its totals.
pub fn assemble_totals(
    settled: &Evaluation,
    currency: &CurrencyResolution,
    rounding: &RoundingPolicy,
) -> Result<AssembledTotals, CalculationError> {
    let mut fees = [Decimal::ZERO; FEE_SLOT_COUNT];
    for (rounded, value) in fees.iter_mut().zip(settled.cascade.values.iter()) {
        *rounded = rounding.money(*value);
    }
    let fees_total = money::sum(fees, "rounded fee total")?;
    let media_budget = rounding.money(settled.media_budget);
    let client_budget = money::add(media_budget, fees_total, "client budget")?;

    let reference_totals = if currency.rate == Decimal::ONE {
        None
    } else {
        Some(convert(media_budget, &fees, currency.rate, rounding)?)
    };

    Ok(AssembledTotals {
        media_budget,
        client_budget,
        fees,
        bonus_value: rounding.money(settled.bonus.bonus_value),
        negotiated_value: settled.bonus.negotiated_value,
        unit_volume: rounding.volume(settled.volume.value),
        reference_totals,
    })
}

fn convert(
    media_budget: Decimal,
    fees: &[Decimal; FEE_SLOT_COUNT],
    rate: Decimal,
    rounding: &RoundingPolicy,
) -> Result<ReferenceTotals, CalculationError> {
    let media = rounding.money(money::mul(media_budget, rate, "reference media budget")?);
    let mut fees_total = Decimal::ZERO;
    for fee in fees {
        let converted = rounding.money(money::mul(*fee, rate, "reference fee")?);
        fees_total = money::add(fees_total, converted, "reference fee total")?;
    }
    let client = money::add(media, fees_total, "reference client budget")?;
    Ok(ReferenceTotals { media_budget: media, fees_total, client_budget: client })
}

/// Write assembled figures into a copy of the input snapshot.
pub fn apply_totals(
    snapshot: &BudgetSnapshot,
    totals: AssembledTotals,
    currency: &CurrencyResolution,
    reference_currency: &CurrencyCode,
) -> BudgetSnapshot {
    let mut updated = snapshot.clone();
    updated.media_budget = totals.media_budget;
    updated.client_budget = totals.client_budget;
    updated.bonus_value = totals.bonus_value;
    updated.negotiated_value = totals.negotiated_value;
    updated.unit_volume = totals.unit_volume;
    updated.currency_rate = currency.rate;
    updated.reference_currency = reference_currency.clone();
    updated.reference_totals = totals.reference_totals;
    for (slot, value) in updated.fees.iter_mut().zip(totals.fees) {
        slot.computed_value = value;
    }
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CalculationMode, CalculationType, ClientFee, FeeOption, FeeSelection, FeeSlot, PricingBasis};
    use crate::engine::currency::RateStatus;
    use crate::engine::solver::solve;
    use crate::engine::validate::bind_fees;
    use crate::options::EngineOptions;
    use rust_decimal_macros::dec;

    fn same_currency() -> CurrencyResolution {
        CurrencyResolution { rate: Decimal::ONE, status: RateStatus::SameCurrency }
    }

    /// Solve, settle and assemble with a single direct percentage fee.
    fn totals(
        mode: BudgetMode,
        input: Decimal,
        percent: Decimal,
        negotiated: Option<Decimal>,
        currency: &CurrencyResolution,
    ) -> AssembledTotals {
        let fees = vec![ClientFee::new(
            "agency",
            1,
            CalculationType::PercentOfBudget,
            CalculationMode::DirectOnMediaBudget,
        )
        .with_option(FeeOption::new("std", percent))];
        let bound = bind_fees(&fees).unwrap();
        let mut slots: [FeeSlot; FEE_SLOT_COUNT] = Default::default();
        slots[0].selection = FeeSelection::selected("std");
        let options = EngineOptions::default();
        let ev = Evaluator {
            bonus_active: negotiated.is_some(),
            negotiated_value: negotiated.unwrap_or_default(),
            unit_price: Decimal::ZERO,
            pricing: PricingBasis::PerUnit,
            slots: &slots,
            fees: &bound,
            options: &options,
        };
        let solution = solve(mode, input, &ev).unwrap();
        let settled = settle(mode, input, &solution, &ev, &options.rounding).unwrap();
        assemble_totals(&settled, currency, &options.rounding).unwrap()
    }

    #[test]
    fn media_mode_fees_follow_rounded_media() {
        let t = totals(BudgetMode::MediaTotal, dec!(1000.005), dec!(0.0333), None, &same_currency());
        assert_eq!(t.media_budget, dec!(1000.01));
        // 3.33% of 1000.01 = 33.300333
        assert_eq!(t.fees[0], dec!(33.30));
        assert_eq!(t.client_budget, t.media_budget + t.fees.iter().sum::<Decimal>());
        assert!(t.reference_totals.is_none());
    }

    #[test]
    fn client_mode_hits_reachable_target_exactly() {
        let t = totals(BudgetMode::ClientTotal, dec!(1150), dec!(0.15), None, &same_currency());
        assert_eq!(t.media_budget, dec!(1000));
        assert_eq!(t.fees[0], dec!(150));
        assert_eq!(t.client_budget, dec!(1150));
    }

    #[test]
    fn client_mode_figures_follow_stored_media() {
        // No cent media budget gives exactly 1000: 869.56 -> 999.99, 869.57 -> 1000.01.
        let t = totals(BudgetMode::ClientTotal, dec!(1000), dec!(0.15), Some(dec!(900)), &same_currency());
        assert_eq!(t.media_budget, dec!(869.56));
        assert_eq!(t.fees[0], (dec!(0.15) * t.media_budget).round_dp(2));
        assert_eq!(t.client_budget, dec!(999.99));
        assert_eq!(t.client_budget, t.media_budget + t.fees[0]);
        assert_eq!(t.media_budget + t.bonus_value, t.negotiated_value);
    }

    #[test]
    fn reference_totals_scale_consistently() {
        let currency = CurrencyResolution { rate: dec!(0.5), status: RateStatus::Converted };
        let t = totals(BudgetMode::MediaTotal, dec!(1000), dec!(0.10), None, &currency);
        let reference = t.reference_totals.unwrap();
        assert_eq!(reference.media_budget, dec!(500));
        assert_eq!(reference.fees_total, dec!(50));
        assert_eq!(reference.client_budget, dec!(550));
    }

    #[test]
    fn apply_writes_derived_fields_only() {
        let t = totals(BudgetMode::MediaTotal, dec!(1000), dec!(0.10), None, &same_currency());
        let snap = BudgetSnapshot::new("EUR")
            .with_budget(BudgetMode::MediaTotal, dec!(1000))
            .with_fee(0, FeeSelection::selected("std"));

        let updated = apply_totals(&snap, t, &same_currency(), &CurrencyCode::from("EUR"));
        assert_eq!(updated.client_budget, dec!(1100));
        assert_eq!(updated.fees[0].computed_value, dec!(100));
        assert_eq!(updated.fees[0].selection, snap.fees[0].selection);
        assert_eq!(updated.budget_input, dec!(1000));
    }
}
