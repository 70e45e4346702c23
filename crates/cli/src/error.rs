//! Error type for the operator CLI.

use passport_ledger_types::{ErrorCode, LedgerError, config::ConfigError};
use snafu::Snafu;

/// Failure of a CLI command.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    /// A ledger operation or snapshot load failed.
    #[snafu(display("{source}"))]
    Ledger {
        /// Underlying ledger error.
        source: LedgerError,
    },

    /// A scripted operation was rejected by the ledger.
    #[snafu(display("operation #{index} ({op}) failed: {source}"))]
    Operation {
        /// 1-based position in the script.
        index: usize,
        /// Operation name.
        op: &'static str,
        /// Ledger rejection.
        source: LedgerError,
    },

    /// An input file could not be read.
    #[snafu(display("failed to read {path}: {source}"))]
    ReadFile {
        /// File path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is invalid.
    #[snafu(display("invalid config {path}: {source}"))]
    Config {
        /// File path.
        path: String,
        /// Validation failure.
        source: ConfigError,
    },

    /// The operation script is malformed.
    #[snafu(display("invalid script {path}: {source}"))]
    Script {
        /// File path.
        path: String,
        /// JSON error with line and column.
        source: serde_json::Error,
    },

    /// `init` would overwrite an existing state file.
    #[snafu(display("state file {path} already exists (pass --force to overwrite)"))]
    StateExists {
        /// File path.
        path: String,
    },

    /// A `show` target does not exist.
    #[snafu(display("{what} not found"))]
    NotFound {
        /// Description of the missing object.
        what: String,
    },

    /// Writing command output failed.
    #[snafu(display("failed to write output: {source}"))]
    Output {
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Output could not be serialized as JSON.
    #[snafu(display("failed to serialize output: {source}"))]
    Serialize {
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Output could not be rendered as TOML.
    #[snafu(display("failed to render TOML: {source}"))]
    Render {
        /// Underlying TOML error.
        source: toml::ser::Error,
    },
}

impl CliError {
    /// Ledger error code, for failures that originate in the ledger.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            CliError::Ledger { source } | CliError::Operation { source, .. } => Some(source.code()),
            _ => None,
        }
    }

    /// Recovery hint for ledger failures.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            CliError::Ledger { source } | CliError::Operation { source, .. } => {
                Some(source.suggested_action())
            },
            _ => None,
        }
    }
}

impl From<LedgerError> for CliError {
    fn from(source: LedgerError) -> Self {
        CliError::Ledger { source }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use passport_ledger_types::{Address, PassportId};

    use super::*;

    #[test]
    fn test_operation_error_carries_ledger_code() {
        let err = CliError::Operation {
            index: 3,
            op: "record_intervention",
            source: LedgerError::OdometerRollback {
                passport_id: PassportId::new(1),
                latest_km: 100,
                attempted_km: 50,
            },
        };
        assert_eq!(err.code(), Some(ErrorCode::DomainOdometerRollback));
        assert!(err.suggested_action().is_some());
        let message = err.to_string();
        assert!(message.starts_with("operation #3 (record_intervention) failed"));
        assert!(message.contains("50 km"));
    }

    #[test]
    fn test_non_ledger_errors_have_no_code() {
        let err = CliError::StateExists { path: "ledger.snap".to_string() };
        assert_eq!(err.code(), None);
        assert!(err.to_string().contains("--force"));
    }

    #[test]
    fn test_from_ledger_error() {
        let caller = Address::parse("0xcc").unwrap();
        let err: CliError = LedgerError::NotAdmin { caller }.into();
        assert_eq!(err.code(), Some(ErrorCode::AuthNotAdmin));
    }
}
