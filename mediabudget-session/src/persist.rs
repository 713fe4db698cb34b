//! Persisted snapshot envelope.
//!
//! A snapshot is stored together with a schema version and the fingerprint of
//! its derived fields. Loading checks both; `verify_round_trip` additionally
//! recalculates and confirms the stored figures are reproduced.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mediabudget_core::domain::BudgetSnapshot;
use mediabudget_core::engine::{try_calculate, CalculationContext, CalculationError};
use mediabudget_core::fingerprint::derived_fingerprint;
use mediabudget_core::options::EngineOptions;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid snapshot envelope: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported schema version {found}, expected {expected}")]
    SchemaVersion { found: u32, expected: u32 },

    #[error("stored fingerprint {stored} does not match snapshot contents {actual}")]
    Corrupted { stored: String, actual: String },

    #[error("recalculation produced different figures (stored {stored}, recalculated {recalculated})")]
    FingerprintMismatch { stored: String, recalculated: String },

    #[error("recalculation failed: {0}")]
    Calculation(#[from] CalculationError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub schema_version: u32,
    pub snapshot: BudgetSnapshot,
    pub fingerprint: String,
}

impl StoredSnapshot {
    pub fn new(snapshot: BudgetSnapshot) -> Self {
        let fingerprint = derived_fingerprint(&snapshot);
        Self { schema_version: SCHEMA_VERSION, snapshot, fingerprint }
    }

    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode and check schema version and fingerprint integrity.
    pub fn from_json(s: &str) -> Result<Self, PersistError> {
        let stored: Self = serde_json::from_str(s)?;
        if stored.schema_version != SCHEMA_VERSION {
            return Err(PersistError::SchemaVersion { found: stored.schema_version, expected: SCHEMA_VERSION });
        }
        let actual = derived_fingerprint(&stored.snapshot);
        if actual != stored.fingerprint {
            return Err(PersistError::Corrupted { stored: stored.fingerprint, actual });
        }
        Ok(stored)
    }

    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PersistError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Recalculate the stored snapshot and confirm the derived figures match.
    pub fn verify_round_trip(
        &self,
        ctx: &CalculationContext<'_>,
        options: &EngineOptions,
    ) -> Result<BudgetSnapshot, PersistError> {
        let calc = try_calculate(&self.snapshot, ctx, options)?;
        let recalculated = calc.report.fingerprint.unwrap_or_default();
        if recalculated != self.fingerprint {
            return Err(PersistError::FingerprintMismatch { stored: self.fingerprint.clone(), recalculated });
        }
        Ok(calc.snapshot)
    }
}
