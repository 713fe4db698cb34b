//! Engine options: solver tolerance, iteration bound, rounding and verbosity.
//!
//! Options are passed explicitly into every calculation. There is no
//! process-wide debug switch; `verbosity` decides how much the engine logs
//! and whether solver steps are recorded in the report.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Largest scale a `Decimal` can carry.
const MAX_DECIMAL_PLACES: u32 = 28;

/// How much detail the engine emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// No log events at all.
    Quiet,
    /// Warnings for advisory conditions.
    #[default]
    Normal,
    /// Per-fee and per-phase detail.
    Debug,
    /// Every solver iteration, also recorded in the report.
    Trace,
}

impl Verbosity {
    pub fn warnings(self) -> bool {
        self >= Self::Normal
    }

    pub fn debug(self) -> bool {
        self >= Self::Debug
    }

    pub fn trace(self) -> bool {
        self >= Self::Trace
    }
}

/// Rounding applied once, when the result is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundingPolicy {
    pub money_decimal_places: u32,
    pub volume_decimal_places: u32,
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self { money_decimal_places: 2, volume_decimal_places: 2 }
    }
}

impl RoundingPolicy {
    /// Round a currency amount, half away from zero.
    pub fn money(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.money_decimal_places, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Round a currency amount down onto the money grid.
    pub fn money_floor(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.money_decimal_places, RoundingStrategy::ToNegativeInfinity)
    }

    /// Smallest currency step, 0.01 at two decimal places.
    pub fn money_step(&self) -> Decimal {
        Decimal::new(1, self.money_decimal_places)
    }

    /// Round a unit volume, half away from zero.
    pub fn volume(&self, value: Decimal) -> Decimal {
        value.round_dp_with_strategy(self.volume_decimal_places, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// Tunables for one calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Client-total solver stops once `|client - target| < tolerance`.
    pub tolerance: Decimal,
    /// Upper bound on solver iterations.
    pub max_iterations: u32,
    pub rounding: RoundingPolicy,
    pub verbosity: Verbosity,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(1, 2), // 0.01
            max_iterations: 50,
            rounding: RoundingPolicy::default(),
            verbosity: Verbosity::default(),
        }
    }
}

impl EngineOptions {
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Parse options from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, OptionsError> {
        let options: Self = toml::from_str(s)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file(path: &Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.tolerance <= Decimal::ZERO {
            return Err(OptionsError::InvalidTolerance(self.tolerance));
        }
        if self.max_iterations == 0 {
            return Err(OptionsError::ZeroIterations);
        }
        for places in [self.rounding.money_decimal_places, self.rounding.volume_decimal_places] {
            if places > MAX_DECIMAL_PLACES {
                return Err(OptionsError::TooManyDecimalPlaces(places));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("failed to read options: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse options: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("tolerance must be positive, got {0}")]
    InvalidTolerance(Decimal),
    #[error("max_iterations must be at least 1")]
    ZeroIterations,
    #[error("at most 28 decimal places are supported, got {0}")]
    TooManyDecimalPlaces(u32),
}
