//! Error types for the test engine
//!
//! Two families live here: [`UtError`] for misuse of the engine itself
//! (configuration, sessions), and [`FatalAbort`], the control signal a fatal
//! assertion raises to leave the enclosing test body.

use thiserror::Error;
use crate::events::SourceLocation;

pub type Result<T> = std::result::Result<T, UtError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UtError {
    #[error("No active test session on this thread")]
    NoActiveSession,

    #[error("A run is already in progress on this thread")]
    RunInProgress,

    #[error("Failed to read config file {path}: {message}")]
    ConfigIo { path: String, message: String },

    #[error("Failed to parse config: {message}")]
    ConfigParse { message: String },

    #[error("Invalid report level: {value}")]
    InvalidReportLevel { value: String },
}

impl UtError {
    pub fn config_io(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigIo {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
        }
    }

    pub fn invalid_report_level(value: impl Into<String>) -> Self {
        Self::InvalidReportLevel {
            value: value.into(),
        }
    }
}

/// Raised by a failed fatal assertion.
///
/// Travels out of a test body as an `anyhow::Error` through `?` and is
/// recognised by the runner with `downcast_ref`, which keeps it apart from
/// genuinely unexpected errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fatal assertion failed at {location}")]
pub struct FatalAbort {
    pub location: SourceLocation,
}

impl FatalAbort {
    pub fn new(location: SourceLocation) -> Self {
        Self { location }
    }

    /// Check whether an error is a fatal abort signal
    pub fn is_abort(error: &anyhow::Error) -> bool {
        error.downcast_ref::<FatalAbort>().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_is_recognised_through_anyhow() {
        let location = SourceLocation::new("tests.rs", 3, 7);
        let error = anyhow::Error::from(FatalAbort::new(location.clone()));
        assert!(FatalAbort::is_abort(&error));
        assert_eq!(error.downcast_ref::<FatalAbort>().unwrap().location, location);

        let other = anyhow::anyhow!("disk on fire");
        assert!(!FatalAbort::is_abort(&other));
    }

    #[test]
    fn test_error_messages() {
        let err = UtError::invalid_report_level("loud");
        assert_eq!(err.to_string(), "Invalid report level: loud");
    }
}
