//! Calculation entry point.
//!
//! `calculate` is a pure function of (snapshot, fee configuration, rates,
//! unit type catalog, options). It reads only input fields of the snapshot,
//! so feeding a result back in reproduces the same derived values.
//!
//! Pipeline: validate → currency → solve (bonus, volume, cascade per
//! candidate) → settle on the money grid → assemble → fingerprint.

use tracing::{debug, warn};

use crate::domain::{
    find_unit_type, BudgetMode, BudgetSnapshot, ClientFee, CurrencyCode, PricingBasis, RateTable,
    UnitType,
};
use crate::engine::assembler::{apply_totals, assemble_totals, settle};
use crate::engine::bonus::BonusStatus;
use crate::engine::currency::resolve_rate;
use crate::engine::report::{Advisory, CalculationReport, FeeOutcome};
use crate::engine::solver::{solve, Evaluator};
use crate::engine::validate::{bind_fees, validate_snapshot};
use crate::engine::volume::VolumeStatus;
use crate::engine::CalculationError;
use crate::fingerprint::derived_fingerprint;
use crate::money;
use crate::options::EngineOptions;

/// Read-only collaborators for one calculation.
#[derive(Debug, Clone, Copy)]
pub struct CalculationContext<'a> {
    pub fees: &'a [ClientFee],
    pub rates: &'a RateTable,
    pub reference_currency: &'a CurrencyCode,
    pub unit_types: &'a [UnitType],
}

/// Successful calculation: the recalculated snapshot and its report.
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub snapshot: BudgetSnapshot,
    pub report: CalculationReport,
}

/// Recalculate a snapshot, always returning a snapshot and a report.
///
/// On a fatal error the input snapshot is returned unchanged with
/// `report.success == false`; callers must not treat it as a new result.
pub fn calculate(
    snapshot: &BudgetSnapshot,
    ctx: &CalculationContext<'_>,
    options: &EngineOptions,
) -> (BudgetSnapshot, CalculationReport) {
    match try_calculate(snapshot, ctx, options) {
        Ok(calc) => (calc.snapshot, calc.report),
        Err(err) => {
            if options.verbosity.warnings() {
                warn!(error = %err, "budget calculation aborted");
            }
            (snapshot.clone(), CalculationReport::failed(&err))
        }
    }
}

/// Recalculate a snapshot, surfacing fatal errors as `Err`.
pub fn try_calculate(
    snapshot: &BudgetSnapshot,
    ctx: &CalculationContext<'_>,
    options: &EngineOptions,
) -> Result<Calculation, CalculationError> {
    let verbosity = options.verbosity;
    let bound = bind_fees(ctx.fees)?;
    validate_snapshot(snapshot, &bound)?;

    let mut advisories = Vec::new();

    let currency = resolve_rate(&snapshot.buy_currency, ctx.reference_currency, ctx.rates)?;
    if currency.is_missing() {
        if verbosity.warnings() {
            warn!(
                buy = %snapshot.buy_currency,
                reference = %ctx.reference_currency,
                "no exchange rate available, amounts left unconverted"
            );
        }
        advisories.push(Advisory::MissingCurrencyRate { currency: snapshot.buy_currency.clone() });
    }

    let pricing = match &snapshot.unit_type {
        None => PricingBasis::PerUnit,
        Some(id) => match find_unit_type(ctx.unit_types, id) {
            Some(unit) => unit.pricing,
            None => {
                advisories.push(Advisory::UnknownUnitType { unit_type: id.clone() });
                PricingBasis::PerUnit
            }
        },
    };

    let evaluator = Evaluator {
        bonus_active: snapshot.bonus_active,
        negotiated_value: snapshot.negotiated_value,
        unit_price: snapshot.unit_price,
        pricing,
        slots: &snapshot.fees,
        fees: &bound,
        options,
    };
    let solution = solve(snapshot.budget_mode, snapshot.budget_input, &evaluator)?;
    let eval = settle(snapshot.budget_mode, snapshot.budget_input, &solution, &evaluator, &options.rounding)?;

    if !eval.cascade.unrecognized.is_empty() {
        // bind_fees rejects these; reaching here means the cascade saw a fee validation did not
        return Err(CalculationError::UnrecognizedCalculationType {
            fee_id: eval.cascade.unrecognized[0].clone(),
        });
    }

    let totals = assemble_totals(&eval, &currency, &options.rounding)?;
    let mut convergence = solution.convergence.clone();
    if snapshot.budget_mode == BudgetMode::ClientTotal {
        convergence.final_difference = money::sub(totals.client_budget, snapshot.budget_input, "solver gap")?;
    }

    match eval.bonus.status {
        BonusStatus::Pending => advisories.push(Advisory::BonusPending),
        BonusStatus::BelowMedia => advisories.push(Advisory::NegotiatedBelowMedia {
            negotiated: eval.bonus.negotiated_value,
            media: totals.media_budget,
        }),
        BonusStatus::Inactive | BonusStatus::Applied => {}
    }
    if eval.volume.status == VolumeStatus::Undetermined {
        advisories.push(Advisory::VolumeUndetermined);
    }
    for (slot, fee_id) in &eval.cascade.ignored_overrides {
        advisories.push(Advisory::OverrideIgnored { slot_number: slot + 1, fee_id: fee_id.clone() });
    }
    if solution.target_below_fixed_fees {
        advisories.push(Advisory::TargetBelowFixedFees {
            target: snapshot.budget_input,
            minimum_client_budget: totals.client_budget,
        });
    }
    if !convergence.has_converged {
        if verbosity.warnings() {
            warn!(
                target = %snapshot.budget_input,
                gap = %convergence.final_difference,
                iterations = convergence.iterations,
                "client total did not converge"
            );
        }
        advisories.push(Advisory::NotConverged { final_difference: convergence.final_difference });
    }

    let updated = apply_totals(snapshot, totals, &currency, ctx.reference_currency);

    let mut fees = eval.cascade.outcomes;
    for (outcome, slot) in fees.iter_mut().zip(updated.fees.iter()) {
        if let FeeOutcome::Computed { value } = outcome {
            *value = slot.computed_value;
        }
    }

    if verbosity.debug() {
        debug!(
            mode = ?snapshot.budget_mode,
            media = %updated.media_budget,
            client = %updated.client_budget,
            fees = %updated.fees_total(),
            volume = %updated.unit_volume,
            bonus = %updated.bonus_value,
            iterations = convergence.iterations,
            "budget calculated"
        );
    }

    let fingerprint = derived_fingerprint(&updated);
    let report = CalculationReport {
        success: true,
        error: None,
        convergence: Some(convergence),
        advisories,
        fees,
        fingerprint: Some(fingerprint),
    };

    Ok(Calculation { snapshot: updated, report })
}
