//! Convergence solver for the client-total / media-budget circularity.
//!
//! Two modes:
//! - **MediaTotal**: media budget is the input. One evaluation, trivially converged.
//! - **ClientTotal**: client total is the input and the media budget is
//!   unknown. `client(m) = m + fees(m)` is non-decreasing in `m`, so the
//!   solver brackets the target and bisects until `|client(m) - target|`
//!   drops below the tolerance or the iteration bound is reached.
//!
//! Bisection always terminates and needs no derivative estimate. On
//! exhaustion the best candidate seen is returned with `has_converged = false`.

use rust_decimal::Decimal;
use tracing::{debug, trace};

use crate::domain::{BudgetMode, FeeSlot, PricingBasis, FEE_SLOT_COUNT};
use crate::engine::bonus::{bonification, Bonification};
use crate::engine::cascade::{run_cascade, BoundFees, CascadeInput, CascadeResult};
use crate::engine::report::{ConvergenceInfo, SolverStep};
use crate::engine::volume::{unit_volume, UnitVolume};
use crate::engine::CalculationError;
use crate::money;
use crate::options::EngineOptions;

/// Doublings allowed while searching for an upper bracket.
const MAX_BRACKET_EXPANSIONS: u32 = 64;

/// Everything that stays fixed while the media budget varies.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    pub bonus_active: bool,
    pub negotiated_value: Decimal,
    pub unit_price: Decimal,
    pub pricing: PricingBasis,
    pub slots: &'a [FeeSlot; FEE_SLOT_COUNT],
    pub fees: &'a BoundFees<'a>,
    pub options: &'a EngineOptions,
}

/// Full-precision state for one candidate media budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub media_budget: Decimal,
    pub bonus: Bonification,
    pub volume: UnitVolume,
    pub cascade: CascadeResult,
    pub client_budget: Decimal,
}

impl Evaluator<'_> {
    /// Bonus → volume → fee cascade for a candidate media budget.
    pub fn evaluate(&self, media_budget: Decimal) -> Result<Evaluation, CalculationError> {
        let bonus = bonification(self.bonus_active, self.negotiated_value, media_budget);
        let effective_budget = money::add(media_budget, bonus.bonus_value, "effective budget")?;
        let volume = unit_volume(effective_budget, self.unit_price, self.pricing)?;
        let cascade = run_cascade(&CascadeInput {
            media_budget,
            volume,
            slots: self.slots,
            fees: self.fees,
            verbosity: self.options.verbosity,
        })?;
        let client_budget = money::add(media_budget, cascade.total, "client budget")?;

        Ok(Evaluation { media_budget, bonus, volume, cascade, client_budget })
    }
}

/// Solver output: the chosen evaluation plus diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub evaluation: Evaluation,
    pub convergence: ConvergenceInfo,
    /// Set when even a zero media budget overshoots the target.
    pub target_below_fixed_fees: bool,
}

/// Resolve the media budget for the snapshot's budget mode.
pub fn solve(
    mode: BudgetMode,
    budget_input: Decimal,
    evaluator: &Evaluator<'_>,
) -> Result<Solution, CalculationError> {
    match mode {
        BudgetMode::MediaTotal => {
            let evaluation = evaluator.evaluate(budget_input)?;
            Ok(Solution {
                evaluation,
                convergence: ConvergenceInfo::trivial(),
                target_below_fixed_fees: false,
            })
        }
        BudgetMode::ClientTotal => solve_client_total(budget_input, evaluator),
    }
}

/// Tracks the candidate closest to the target.
struct Search {
    target: Decimal,
    best: Evaluation,
    best_gap: Decimal,
    bracket_evaluations: u32,
    steps: Vec<SolverStep>,
    record_steps: bool,
}

impl Search {
    fn new(target: Decimal, first: Evaluation, record_steps: bool) -> Result<Self, CalculationError> {
        let best_gap = money::sub(first.client_budget, target, "solver gap")?.abs();
        Ok(Self { target, best: first, best_gap, bracket_evaluations: 1, steps: Vec::new(), record_steps })
    }

    fn gap(&self, eval: &Evaluation) -> Result<Decimal, CalculationError> {
        money::sub(eval.client_budget, self.target, "solver gap")
    }

    /// Evaluate an upper bracket candidate and keep it if it is the best so far.
    fn bracket(&mut self, evaluator: &Evaluator<'_>, media: Decimal) -> Result<Decimal, CalculationError> {
        let eval = evaluator.evaluate(media)?;
        let gap = self.gap(&eval)?;
        self.offer(&eval, gap);
        self.bracket_evaluations += 1;
        Ok(gap)
    }

    fn offer(&mut self, eval: &Evaluation, gap: Decimal) {
        if gap.abs() < self.best_gap {
            self.best = eval.clone();
            self.best_gap = gap.abs();
        }
    }

    fn record(&mut self, iteration: u32, eval: &Evaluation, gap: Decimal) {
        if self.record_steps {
            self.steps.push(SolverStep {
                iteration,
                media_budget: eval.media_budget,
                client_budget: eval.client_budget,
                difference: gap,
            });
        }
    }

    fn finish(self, has_converged: bool, iterations: u32, below_fixed: bool) -> Result<Solution, CalculationError> {
        let final_difference = money::sub(self.best.client_budget, self.target, "solver gap")?;
        Ok(Solution {
            evaluation: self.best,
            convergence: ConvergenceInfo {
                has_converged,
                final_difference,
                iterations,
                bracket_evaluations: self.bracket_evaluations,
                steps: self.steps,
            },
            target_below_fixed_fees: below_fixed,
        })
    }
}

fn solve_client_total(target: Decimal, evaluator: &Evaluator<'_>) -> Result<Solution, CalculationError> {
    let options = evaluator.options;
    let tolerance = options.tolerance;
    let verbosity = options.verbosity;

    // Lower bracket: nothing spent on media.
    let floor = evaluator.evaluate(Decimal::ZERO)?;
    let mut search = Search::new(target, floor.clone(), verbosity.trace())?;
    let floor_gap = search.gap(&floor)?;
    if floor_gap.abs() < tolerance {
        return search.finish(true, 0, false);
    }
    if floor_gap > Decimal::ZERO {
        // Fixed fees alone exceed the target; no non-negative media budget reaches it.
        if verbosity.debug() {
            debug!(target = %target, floor = %floor.client_budget, "client target below fixed fees");
        }
        return search.finish(false, 0, true);
    }

    // Upper bracket: with non-negative fees, m = target already reaches it.
    let mut high = target;
    let mut high_gap = search.bracket(evaluator, high)?;
    let mut expansions = 0;
    while high_gap < Decimal::ZERO && expansions < MAX_BRACKET_EXPANSIONS {
        high = match high.checked_mul(Decimal::TWO) {
            Some(next) => next,
            None => break,
        };
        high_gap = search.bracket(evaluator, high)?;
        expansions += 1;
    }
    if high_gap.abs() < tolerance {
        return search.finish(true, 0, false);
    }
    if high_gap < Decimal::ZERO {
        return search.finish(false, 0, false);
    }

    let mut low = Decimal::ZERO;
    for iteration in 1..=options.max_iterations {
        let mid = money::div(money::add(low, high, "solver bracket")?, Decimal::TWO, "solver bracket")?;
        let eval = evaluator.evaluate(mid)?;
        let gap = search.gap(&eval)?;
        search.record(iteration, &eval, gap);
        search.offer(&eval, gap);

        if verbosity.trace() {
            trace!(iteration, media = %mid, client = %eval.client_budget, gap = %gap, "solver step");
        }

        if gap.abs() < tolerance {
            if verbosity.debug() {
                debug!(iterations = iteration, media = %mid, "client target converged");
            }
            return search.finish(true, iteration, false);
        }
        if gap < Decimal::ZERO {
            low = mid;
        } else {
            high = mid;
        }
    }

    search.finish(false, options.max_iterations, false)
}
