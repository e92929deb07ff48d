//! Error types for the overseer supervisor.
//!
//! All process operations report failures through [`ProcessError`]. The
//! variants carry the identity of the process they relate to (a pid or an
//! executable path rendered as a string) plus a human-readable reason, so
//! errors routed through callbacks are self-describing without extra
//! context from the call site.

use thiserror::Error;

/// Process-specific error type for supervisor operations.
#[derive(Error, Debug, Clone)]
pub enum ProcessError {
    /// No process could be resolved for the given identifier.
    #[error("Process not found: {id}")]
    NotFound { id: String },

    /// The OS refused to create the process (bad path, permissions, ...).
    #[error("Process spawn failed: {id} - {reason}")]
    SpawnFailed { id: String, reason: String },

    /// A graceful stop attempt failed.
    #[error("Process stop failed: {id} - {reason}")]
    StopFailed { id: String, reason: String },

    /// A forced termination failed.
    #[error("Process kill failed: {id} - {reason}")]
    KillFailed { id: String, reason: String },

    /// The existence/liveness probe itself failed.
    #[error("Process check failed: {id} - {reason}")]
    CheckFailed { id: String, reason: String },

    /// An operation did not complete within its bounded wait.
    #[error("Process timeout: {id} - {operation}")]
    Timeout { id: String, operation: String },

    /// Invalid input or configuration.
    #[error("Process configuration error: {id} - {reason}")]
    Configuration { id: String, reason: String },
}

impl ProcessError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn spawn_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn stop_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StopFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn kill_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::KillFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn check_failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CheckFailed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Timeout {
            id: id.into(),
            operation: operation.into(),
        }
    }

    pub fn configuration(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = ProcessError::not_found("1234");
        assert!(matches!(error, ProcessError::NotFound { .. }));
        assert_eq!(format!("{}", error), "Process not found: 1234");

        let error = ProcessError::spawn_failed("/bin/missing", "no such file");
        assert!(matches!(error, ProcessError::SpawnFailed { .. }));
        assert!(format!("{}", error).contains("spawn failed"));
    }

    #[test]
    fn test_error_is_cloneable() {
        let error = ProcessError::timeout("42", "stop");
        let clone = error.clone();
        assert_eq!(format!("{}", error), format!("{}", clone));
    }
}
