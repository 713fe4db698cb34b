//! Media budget session — the controller layer around the core engine.
//!
//! This crate builds on `mediabudget-core` to provide:
//! - Provider traits for fee configuration and exchange rates
//! - Scenario files (TOML or JSON) bundling a snapshot with its environment
//! - Intent tracking so switched-on fees survive zero-value states
//! - Edit sessions that apply one change at a time and recalculate
//! - A versioned, fingerprinted persistence envelope

pub mod intent;
pub mod persist;
pub mod provider;
pub mod scenario;
pub mod session;

pub use intent::{IntentTracker, Restored};
pub use persist::{PersistError, StoredSnapshot, SCHEMA_VERSION};
pub use provider::{context, FeeConfigProvider, RateProvider, StaticConfig};
pub use scenario::{Scenario, ScenarioError};
pub use session::{BudgetEdit, EditOutcome, EditSession, SessionError};
