use thiserror::Error;

/// Result type for training core operations
pub type Result<T> = std::result::Result<T, DqnError>;

/// Main error type for the DQN training core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DqnError {
    /// Replay buffer holds fewer transitions than requested.
    /// The trainer recovers from this locally by skipping the step.
    #[error("Insufficient data: requested {requested} transitions, buffer holds {available}")]
    InsufficientData {
        requested: usize,
        available: usize,
    },

    /// NaN or infinity in loss, gradients or TD targets
    #[error("Numeric instability: {0}")]
    NumericInstability(String),

    /// Malformed reset/step response from the environment
    #[error("Environment error: {0}")]
    Environment(String),

    /// Invalid hyperparameter, raised before any training occurs
    #[error("Invalid configuration '{name}': {reason}")]
    Configuration {
        name: String,
        reason: String,
    },

    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for DqnError {
    fn from(err: std::io::Error) -> Self {
        DqnError::Io(err.to_string())
    }
}

impl From<bincode::Error> for DqnError {
    fn from(err: bincode::Error) -> Self {
        DqnError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DqnError {
    fn from(err: serde_json::Error) -> Self {
        DqnError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for DqnError {
    fn from(err: toml::de::Error) -> Self {
        DqnError::Configuration {
            name: "config".to_string(),
            reason: err.to_string(),
        }
    }
}

// Helper functions for common error patterns
impl DqnError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        DqnError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn configuration<S: Into<String>, R: Into<String>>(name: S, reason: R) -> Self {
        DqnError::Configuration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn environment<S: Into<String>>(msg: S) -> Self {
        DqnError::Environment(msg.into())
    }

    pub fn numeric<S: Into<String>>(msg: S) -> Self {
        DqnError::NumericInstability(msg.into())
    }

    /// Whether the run must stop on this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DqnError::InsufficientData { .. })
    }
}
