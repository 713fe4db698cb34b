//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Media-mode identity — client == media + Σ fees, exactly
//! 2. Client-mode convergence — the stored media is the cent closest to the target
//! 3. Idempotence — feeding a result back yields identical derived fields
//! 4. Bonus clearing — an inactive bonus always zeroes negotiated and bonus value
//! 5. Monotonicity — a larger media budget never lowers the client total

use proptest::prelude::*;
use rust_decimal::Decimal;
use mediabudget_core::domain::{
    BudgetMode, BudgetSnapshot, CalculationMode, CalculationType, ClientFee, CurrencyCode,
    FeeOption, FeeSelection, RateTable, UnitType,
};
use mediabudget_core::engine::{calculate, CalculationContext};
use mediabudget_core::options::EngineOptions;

// ── Strategies (proptest) ────────────────────────────────────────────

/// Money amount with two decimals, 0 .. 10M.
fn arb_money() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Percentage expressed as a fraction with four decimals, 0 .. 0.30.
fn arb_rate() -> impl Strategy<Value = Decimal> {
    (0i64..3_000).prop_map(|bp| Decimal::new(bp, 4))
}

/// Unit price with two decimals, 0 .. 50 (zero leaves volume undetermined).
fn arb_unit_price() -> impl Strategy<Value = Decimal> {
    (0i64..5_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_selection() -> impl Strategy<Value = FeeSelection> {
    prop_oneof![
        Just(FeeSelection::Inactive),
        Just(FeeSelection::ActiveUnselected),
        Just(FeeSelection::selected("std")),
        Just(FeeSelection::selected("std")),
    ]
}

/// Five fees, one per calculation type plus a second percentage.
fn arb_fees() -> impl Strategy<Value = Vec<ClientFee>> {
    (arb_rate(), arb_rate(), arb_rate(), 0i64..100_000, -50i64..50).prop_map(
        |(direct, cascaded, per_unit, fixed_cents, buffer)| {
            vec![
                ClientFee::new("direct", 1, CalculationType::PercentOfBudget, CalculationMode::DirectOnMediaBudget)
                    .with_option(FeeOption::new("std", direct)),
                ClientFee::new("cascaded", 2, CalculationType::PercentOfBudget, CalculationMode::OnCascadedBase)
                    .with_option(FeeOption::new("std", cascaded).with_buffer(Decimal::from(buffer))),
                ClientFee::new("serving", 3, CalculationType::PerUnitVolume, CalculationMode::DirectOnMediaBudget)
                    .with_option(FeeOption::new("std", per_unit / Decimal::ONE_THOUSAND)),
                ClientFee::new("report", 4, CalculationType::PerUnitCount, CalculationMode::DirectOnMediaBudget)
                    .with_option(FeeOption::new("std", Decimal::new(fixed_cents, 2))),
                ClientFee::new("setup", 5, CalculationType::FixedAmount, CalculationMode::DirectOnMediaBudget)
                    .with_option(FeeOption::new("std", Decimal::new(fixed_cents, 2))),
            ]
        },
    )
}

fn arb_snapshot(mode: BudgetMode) -> impl Strategy<Value = BudgetSnapshot> {
    (
        arb_money(),
        arb_unit_price(),
        any::<bool>(),
        arb_money(),
        any::<bool>(),
        proptest::array::uniform5(arb_selection()),
    )
        .prop_map(move |(budget, price, cpm, negotiated, bonus, selections)| {
            let unit = if cpm { "cpm" } else { "unit" };
            let mut snap = BudgetSnapshot::new("EUR").with_budget(mode, budget).with_unit(unit, price);
            if bonus {
                snap = snap.with_bonus(negotiated);
            }
            for (slot, selection) in selections.into_iter().enumerate() {
                snap = snap.with_fee(slot, selection);
            }
            snap
        })
}

fn run(snapshot: &BudgetSnapshot, fees: &[ClientFee]) -> (BudgetSnapshot, mediabudget_core::CalculationReport) {
    let rates = RateTable::new();
    let eur = CurrencyCode::from("EUR");
    let units = vec![UnitType::per_mille("cpm", "Impressions"), UnitType::per_unit("unit", "Units")];
    let ctx = CalculationContext { fees, rates: &rates, reference_currency: &eur, unit_types: &units };
    calculate(snapshot, &ctx, &EngineOptions::default())
}

// ── 1. Media-mode identity ───────────────────────────────────────────

proptest! {
    #[test]
    fn media_mode_identity(snap in arb_snapshot(BudgetMode::MediaTotal), fees in arb_fees()) {
        let (out, report) = run(&snap, &fees);
        prop_assert!(report.success, "{:?}", report.error);
        prop_assert!(report.has_converged());
        prop_assert_eq!(out.client_budget, out.media_budget + out.fees_total());
        prop_assert_eq!(out.media_budget, snap.budget_input);
    }
}

// ── 2. Client-mode convergence ───────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Targets at or above the zero-media floor are reachable and must converge.
    #[test]
    fn client_mode_converges(snap in arb_snapshot(BudgetMode::ClientTotal), fees in arb_fees()) {
        let mut floor_input = snap.clone();
        floor_input.budget_mode = BudgetMode::MediaTotal;
        floor_input.budget_input = Decimal::ZERO;
        let (floor, _) = run(&floor_input, &fees);
        prop_assume!(snap.budget_input >= floor.client_budget + Decimal::ONE);

        let (out, report) = run(&snap, &fees);
        prop_assert!(report.success, "{:?}", report.error);
        prop_assert!(report.has_converged(), "{:?}", report.convergence);
        prop_assert_eq!(out.client_budget, out.media_budget + out.fees_total());
        prop_assert!(out.media_budget >= Decimal::ZERO);
        if out.bonus_value > Decimal::ZERO {
            prop_assert_eq!(out.media_budget + out.bonus_value, out.negotiated_value);
        }

        // No neighbouring cent of media lands closer to the target.
        let gap = (out.client_budget - snap.budget_input).abs();
        let cent = Decimal::new(1, 2);
        for media in [out.media_budget - cent, out.media_budget + cent] {
            if media < Decimal::ZERO {
                continue;
            }
            let mut neighbour = snap.clone();
            neighbour.budget_mode = BudgetMode::MediaTotal;
            neighbour.budget_input = media;
            let (alt, _) = run(&neighbour, &fees);
            prop_assert!(
                (alt.client_budget - snap.budget_input).abs() >= gap,
                "media {} gives {} vs stored {}", media, alt.client_budget, out.client_budget
            );
        }
    }
}

// ── 3. Idempotence ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn recalculation_is_idempotent(
        mode in prop_oneof![Just(BudgetMode::MediaTotal), Just(BudgetMode::ClientTotal)],
        fees in arb_fees(),
        seed in arb_snapshot(BudgetMode::MediaTotal),
    ) {
        let mut snap = seed;
        snap.budget_mode = mode;
        let (first, r1) = run(&snap, &fees);
        let (second, r2) = run(&first, &fees);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(r1.fingerprint, r2.fingerprint);
    }
}

// ── 4. Bonus clearing ────────────────────────────────────────────────

proptest! {
    #[test]
    fn inactive_bonus_is_cleared(snap in arb_snapshot(BudgetMode::MediaTotal), negotiated in arb_money(), fees in arb_fees()) {
        let mut off = snap;
        off.bonus_active = false;
        off.negotiated_value = negotiated;
        let (out, report) = run(&off, &fees);
        prop_assert!(report.success);
        prop_assert_eq!(out.negotiated_value, Decimal::ZERO);
        prop_assert_eq!(out.bonus_value, Decimal::ZERO);
    }
}

// ── 5. Monotonicity ──────────────────────────────────────────────────

proptest! {
    /// The solver relies on client(m) being non-decreasing in m.
    #[test]
    fn client_total_non_decreasing(snap in arb_snapshot(BudgetMode::MediaTotal), extra in arb_money(), fees in arb_fees()) {
        let (low, _) = run(&snap, &fees);
        let mut bigger = snap.clone();
        bigger.budget_input += extra;
        let (high, _) = run(&bigger, &fees);
        prop_assert!(high.client_budget >= low.client_budget);
    }
}
