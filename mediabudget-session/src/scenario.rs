//! Scenario files: a snapshot plus everything needed to calculate it.
//!
//! Format is chosen by extension: `.json` is JSON, anything else is TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use mediabudget_core::domain::{BudgetSnapshot, ClientFee, CurrencyCode, RateTable, UnitType};
use mediabudget_core::options::{EngineOptions, OptionsError};

use crate::provider::{FeeConfigProvider, RateProvider};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to access scenario '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML scenario: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON scenario: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid engine options: {0}")]
    Options(#[from] OptionsError),

    #[error("failed to encode scenario: {0}")]
    Encode(String),
}

/// One tactic's budget inputs and its calculation environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub options: EngineOptions,
    pub snapshot: BudgetSnapshot,
    #[serde(default)]
    pub fees: Vec<ClientFee>,
    #[serde(default)]
    pub unit_types: Vec<UnitType>,
    #[serde(default)]
    pub rates: RateTable,
    /// Defaults to the snapshot's buy currency.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_currency: Option<CurrencyCode>,
}

impl Scenario {
    pub fn new(snapshot: BudgetSnapshot) -> Self {
        Self {
            options: EngineOptions::default(),
            snapshot,
            fees: Vec::new(),
            unit_types: Vec::new(),
            rates: RateTable::new(),
            reference_currency: None,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(s)?;
        scenario.options.validate()?;
        Ok(scenario)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = serde_json::from_str(s)?;
        scenario.options.validate()?;
        Ok(scenario)
    }

    /// Load a scenario, picking the format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ScenarioError::Io { path: path.to_path_buf(), source })?;
        if is_json(path) {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Write the scenario back out in the format implied by `path`.
    pub fn save(&self, path: &Path) -> Result<(), ScenarioError> {
        let content = if is_json(path) {
            serde_json::to_string_pretty(self)?
        } else {
            toml::to_string_pretty(self).map_err(|e| ScenarioError::Encode(e.to_string()))?
        };
        std::fs::write(path, content)
            .map_err(|source| ScenarioError::Io { path: path.to_path_buf(), source })
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}

impl FeeConfigProvider for Scenario {
    fn fees(&self) -> &[ClientFee] {
        &self.fees
    }

    fn unit_types(&self) -> &[UnitType] {
        &self.unit_types
    }
}

impl RateProvider for Scenario {
    fn rates(&self) -> &RateTable {
        &self.rates
    }

    fn reference_currency(&self) -> &CurrencyCode {
        self.reference_currency.as_ref().unwrap_or(&self.snapshot.buy_currency)
    }
}
