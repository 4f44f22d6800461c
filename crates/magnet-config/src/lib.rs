// crates/magnet-config/src/lib.rs
// ============================================================================
// Module: MAGNET Configuration
// Description: Canonical configuration model with fail-closed TOML loading.
// Purpose: Validate every tunable before the core consumes it.
// Dependencies: magnet-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Hosts configure the MAGNET core through one TOML document. Loading is
//! strict and fail-closed: path and size guards run before the file is read,
//! unknown keys are rejected, and semantic validation checks every limit.
//! A default configuration is always valid.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use magnet_core::CascadeConfig;
use magnet_core::CycleConfig;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum accepted config path length, bytes.
const MAX_PATH_LENGTH: usize = 4_096;
/// Maximum accepted config file size, bytes.
const MAX_FILE_SIZE: u64 = 1_048_576;
/// Maximum accepted float precision for canonical exports.
const MAX_FLOAT_PRECISION: u32 = 12;
/// Accepted level-of-detail tier names.
const LOD_TIERS: [&str; 4] = ["low", "medium", "high", "ultra"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config path exceeds the accepted length.
    #[error("config path exceeds max length of {MAX_PATH_LENGTH} bytes")]
    PathTooLong,
    /// The config file could not be read.
    #[error("config read failed: {0}")]
    Read(String),
    /// The config file exceeds the accepted size.
    #[error("config file size {size} exceeds max of {MAX_FILE_SIZE} bytes")]
    TooLarge {
        /// Observed file size.
        size: u64,
    },
    /// The config file is not valid UTF-8.
    #[error("config file is not valid utf-8")]
    Encoding,
    /// The config file failed TOML parsing.
    #[error("config parse failed: {0}")]
    Parse(String),
    /// The config failed semantic validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Cycle executor tunables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleSection {
    /// Maximum revision iterations before escalation.
    pub max_iterations: u32,
    /// Wall-clock deadline for a single cycle, seconds.
    pub timeout_seconds: f64,
    /// When true, warnings fail validation too.
    pub strict_mode: bool,
    /// When true, approved proposals report as committed.
    pub auto_commit: bool,
    /// When true, each iteration runs inside a transaction.
    pub use_transactions: bool,
    /// When true, non-approve exits restore the pre-cycle state.
    pub rollback_on_failure: bool,
}

impl Default for CycleSection {
    fn default() -> Self {
        let defaults = CycleConfig::default();
        Self {
            max_iterations: defaults.max_iterations,
            timeout_seconds: defaults.timeout_seconds,
            strict_mode: defaults.strict_mode,
            auto_commit: defaults.auto_commit,
            use_transactions: defaults.use_transactions,
            rollback_on_failure: defaults.rollback_on_failure,
        }
    }
}

/// Cascade executor tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CascadeSection {
    /// When true, the first recompute failure skips the remainder.
    pub abort_on_failure: bool,
}

/// Invalidation engine tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InvalidationSection {
    /// Event ring-buffer capacity.
    pub event_capacity: usize,
}

impl Default for InvalidationSection {
    fn default() -> Self {
        Self {
            event_capacity: 10_000,
        }
    }
}

/// Trigger log tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TriggerLogSection {
    /// Maximum retained entries.
    pub capacity: usize,
    /// Float precision applied on export.
    pub float_precision: u32,
}

impl Default for TriggerLogSection {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            float_precision: 6,
        }
    }
}

/// Geometry export tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSection {
    /// Level-of-detail tier (`low`, `medium`, `high`, `ultra`).
    pub lod: String,
    /// Float precision applied to state exports.
    pub float_precision: u32,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            lod: "medium".to_string(),
            float_precision: 6,
        }
    }
}

// ============================================================================
// SECTION: Configuration Root
// ============================================================================

/// Complete MAGNET core configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MagnetConfig {
    /// Cycle executor settings.
    pub cycle: CycleSection,
    /// Cascade executor settings.
    pub cascade: CascadeSection,
    /// Invalidation engine settings.
    pub invalidation: InvalidationSection,
    /// Trigger log settings.
    pub trigger_log: TriggerLogSection,
    /// Geometry export settings.
    pub export: ExportSection,
}

impl MagnetConfig {
    /// Loads configuration from a TOML file, or defaults when `path` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on guard, parse, or validation failure.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if path.as_os_str().len() > MAX_PATH_LENGTH {
            return Err(ConfigError::PathTooLong);
        }
        let metadata = fs::metadata(path).map_err(|err| ConfigError::Read(err.to_string()))?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                size: metadata.len(),
            });
        }
        let bytes = fs::read(path).map_err(|err| ConfigError::Read(err.to_string()))?;
        let text = String::from_utf8(bytes).map_err(|_| ConfigError::Encoding)?;
        let config: Self =
            toml::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every limit; fail-closed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle.max_iterations == 0 {
            return Err(ConfigError::Invalid("cycle.max_iterations must be at least 1".to_string()));
        }
        if !self.cycle.timeout_seconds.is_finite() || self.cycle.timeout_seconds <= 0.0 {
            return Err(ConfigError::Invalid(
                "cycle.timeout_seconds must be a positive finite number".to_string(),
            ));
        }
        if self.invalidation.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "invalidation.event_capacity must be at least 1".to_string(),
            ));
        }
        if self.trigger_log.capacity == 0 {
            return Err(ConfigError::Invalid(
                "trigger_log.capacity must be at least 1".to_string(),
            ));
        }
        if self.trigger_log.float_precision > MAX_FLOAT_PRECISION {
            return Err(ConfigError::Invalid(format!(
                "trigger_log.float_precision must be at most {MAX_FLOAT_PRECISION}"
            )));
        }
        if self.export.float_precision > MAX_FLOAT_PRECISION {
            return Err(ConfigError::Invalid(format!(
                "export.float_precision must be at most {MAX_FLOAT_PRECISION}"
            )));
        }
        if !LOD_TIERS.contains(&self.export.lod.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "export.lod must be one of {}",
                LOD_TIERS.join(", ")
            )));
        }
        Ok(())
    }

    /// Builds the cycle executor configuration.
    #[must_use]
    pub const fn cycle_config(&self) -> CycleConfig {
        CycleConfig {
            max_iterations: self.cycle.max_iterations,
            timeout_seconds: self.cycle.timeout_seconds,
            strict_mode: self.cycle.strict_mode,
            auto_commit: self.cycle.auto_commit,
            use_transactions: self.cycle.use_transactions,
            rollback_on_failure: self.cycle.rollback_on_failure,
        }
    }

    /// Builds the cascade executor configuration.
    #[must_use]
    pub const fn cascade_config(&self) -> CascadeConfig {
        CascadeConfig {
            abort_on_failure: self.cascade.abort_on_failure,
        }
    }
}
