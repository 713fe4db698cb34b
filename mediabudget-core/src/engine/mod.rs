//! Budget engine — validation, solving, cascade and result assembly.
//!
//! One calculation runs five stages:
//!
//! 1. Validate the fee configuration and bind fees to slots by order
//! 2. Resolve the exchange rate against the reference currency
//! 3. Solve for the media budget (direct, or bisection on a client target)
//! 4. Per candidate: bonification, unit volume, fee cascade
//! 5. Settle media on the money grid, round, reconcile totals and fingerprint

pub mod assembler;
pub mod bonus;
pub mod calculate;
pub mod cascade;
pub mod currency;
pub mod error;
pub mod report;
pub mod solver;
pub mod validate;
pub mod volume;

pub use assembler::{apply_totals, assemble_totals, settle, AssembledTotals};
pub use bonus::{bonification, Bonification, BonusStatus};
pub use calculate::{calculate, try_calculate, Calculation, CalculationContext};
pub use cascade::{apply_buffer, run_cascade, BoundFees, CascadeInput, CascadeResult};
pub use currency::{resolve_rate, CurrencyResolution, RateStatus};
pub use error::CalculationError;
pub use report::{
    Advisory, CalculationReport, ConvergenceInfo, FeeOutcome, PendingReason, SolverStep,
};
pub use solver::{solve, Evaluation, Evaluator, Solution};
pub use validate::{bind_fees, validate_fees, validate_snapshot};
pub use volume::{unit_volume, UnitVolume, VolumeStatus};
