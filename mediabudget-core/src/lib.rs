//! Media budget core — domain types and the budget calculation engine.
//!
//! This crate turns a budget snapshot into a fully derived one:
//! - Domain types (snapshot, fee slots, fee configuration, unit types)
//! - Checked decimal arithmetic and a single rounding point
//! - Fee cascade with per-unit, percentage and fixed fees
//! - Convergence solver for client-total budgets
//! - Currency conversion against a reference currency
//! - Structured report with advisories and a result fingerprint

pub mod domain;
pub mod engine;
pub mod fingerprint;
pub mod money;
pub mod options;

pub use engine::{calculate, try_calculate, CalculationContext, CalculationError, CalculationReport};
pub use options::{EngineOptions, OptionsError, RoundingPolicy, Verbosity};
