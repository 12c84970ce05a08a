//! Scenario loading and validation errors.

use thiserror::Error;

/// Error raised while resolving, parsing or validating a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The scenario file could not be read.
    #[error("failed to read scenario file: {0}")]
    Io(#[from] std::io::Error),

    /// The scenario file is not valid TOML (or has the wrong shape).
    #[error("failed to parse scenario file: {0}")]
    Parse(#[from] toml::de::Error),

    /// No built-in scenario with the requested name.
    #[error("unknown scenario `{0}`")]
    Unknown(String),

    /// The definition parsed but violates a structural rule.
    #[error("scenario `{name}` is invalid: {reason}")]
    Invalid { name: String, reason: String },
}
