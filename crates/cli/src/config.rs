//! Command-line surface and configuration loading.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use passport_ledger_types::{Address, PassportId, config::LedgerConfig};
use snafu::ResultExt;

use crate::error::{CliError, ConfigSnafu, ReadFileSnafu, RenderSnafu, SerializeSnafu};

/// Default location of the ledger state file.
pub const DEFAULT_STATE_PATH: &str = "passport-ledger.snap";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text.
    Text,
    /// One JSON object per record.
    Json,
    /// JSON when stdout is not a terminal, text otherwise.
    #[default]
    Auto,
}

/// Vehicle passport ledger operator tool.
#[derive(Debug, Parser)]
#[command(name = "passport-ledger", version, about)]
pub struct Cli {
    /// Ledger configuration file (TOML). Defaults apply when omitted.
    #[arg(long, global = true, env = "PASSPORT_LEDGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Ledger state file.
    #[arg(long, global = true, env = "PASSPORT_LEDGER_STATE", default_value = DEFAULT_STATE_PATH)]
    pub state: PathBuf,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Auto)]
    pub log_format: LogFormat,

    /// Command to run.
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Bootstrap a new ledger and write its state file.
    Init {
        /// Address that becomes the permanent registry admin.
        #[arg(long)]
        admin: Address,
        /// Overwrite an existing state file.
        #[arg(long)]
        force: bool,
    },
    /// Apply a JSON script of operations and persist the result.
    Apply {
        /// Script file: a JSON array of operations.
        script: PathBuf,
        /// Log failed operations and keep going instead of stopping.
        #[arg(long)]
        continue_on_error: bool,
    },
    /// Print ledger state as JSON.
    Show {
        /// What to print.
        #[command(subcommand)]
        target: ShowTarget,
    },
    /// Configuration utilities.
    Config {
        /// Config action to run.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Targets of the `show` command.
#[derive(Debug, Subcommand)]
pub enum ShowTarget {
    /// Registry summary with the full workshop directory.
    Registry,
    /// One workshop entry (first match for duplicated addresses).
    Workshop {
        /// Workshop address.
        address: Address,
    },
    /// One passport with its version and full history.
    Passport {
        /// Passport id, either `3` or `passport:3`.
        id: PassportId,
    },
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the JSON Schema of the configuration file.
    Schema,
    /// Print a configuration file with every default spelled out.
    Example,
}

/// Loads the ledger configuration, falling back to defaults when `path` is `None`.
///
/// # Errors
///
/// Returns [`CliError::ReadFile`] if the file cannot be read and
/// [`CliError::Config`] if it does not parse or validate.
pub fn load_ledger_config(path: Option<&Path>) -> Result<LedgerConfig, CliError> {
    let Some(path) = path else {
        return Ok(LedgerConfig::default());
    };
    let display = path.display().to_string();
    let source = std::fs::read_to_string(path).context(ReadFileSnafu { path: display.clone() })?;
    let config = LedgerConfig::from_toml(&source).context(ConfigSnafu { path: display })?;
    tracing::debug!(path = %path.display(), "loaded ledger config");
    Ok(config)
}

/// JSON Schema for [`LedgerConfig`].
///
/// # Errors
///
/// Returns [`CliError::Serialize`] if the schema cannot be rendered.
pub fn generate_config_schema() -> Result<String, CliError> {
    let schema = schemars::schema_for!(LedgerConfig);
    let mut json = serde_json::to_string_pretty(&schema).context(SerializeSnafu)?;
    json.push('\n');
    Ok(json)
}

/// Default [`LedgerConfig`] rendered as TOML.
///
/// # Errors
///
/// Returns [`CliError::Render`] if the config cannot be rendered.
pub fn generate_config_example() -> Result<String, CliError> {
    let body = toml::to_string_pretty(&LedgerConfig::default()).context(RenderSnafu)?;
    Ok(format!("# passport-ledger configuration (all values are defaults)\n\n{body}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use clap::CommandFactory;
    use passport_ledger_types::config::DuplicateWorkshopPolicy;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_init_with_global_flags() {
        let cli = Cli::try_parse_from([
            "passport-ledger",
            "init",
            "--admin",
            "0xAD",
            "--state",
            "/tmp/x.snap",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.state, PathBuf::from("/tmp/x.snap"));
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            CliCommand::Init { admin, force } => {
                assert_eq!(admin.as_str(), "0xad");
                assert!(!force);
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_address() {
        assert!(Cli::try_parse_from(["passport-ledger", "init", "--admin", "ad"]).is_err());
    }

    #[test]
    fn test_parse_show_passport_accepts_prefixed_id() {
        let cli = Cli::try_parse_from(["passport-ledger", "show", "passport", "passport:7"]).unwrap();
        match cli.command {
            CliCommand::Show { target: ShowTarget::Passport { id } } => {
                assert_eq!(id, PassportId::new(7));
            },
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_load_config_defaults_when_absent() {
        assert_eq!(load_ledger_config(None).unwrap(), LedgerConfig::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.toml");
        std::fs::write(&path, "[registration]\nduplicate_workshops = \"reject\"\n").unwrap();
        let config = load_ledger_config(Some(&path)).unwrap();
        assert_eq!(config.registration.duplicate_workshops, DuplicateWorkshopPolicy::Reject);
    }

    #[test]
    fn test_load_config_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(load_ledger_config(Some(&missing)), Err(CliError::ReadFile { .. })));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[events]\ncapacity = 0\n").unwrap();
        assert!(matches!(load_ledger_config(Some(&bad)), Err(CliError::Config { .. })));
    }

    #[test]
    fn test_schema_lists_every_section() {
        let value: serde_json::Value =
            serde_json::from_str(&generate_config_schema().unwrap()).unwrap();
        assert_eq!(value.get("title").and_then(|v| v.as_str()), Some("LedgerConfig"));
        let props = value.get("properties").and_then(|v| v.as_object()).unwrap();
        for section in ["limits", "registration", "mint", "events"] {
            assert!(props.contains_key(section), "missing {section}");
        }
    }

    #[test]
    fn test_example_parses_back_to_defaults() {
        let example = generate_config_example().unwrap();
        assert_eq!(LedgerConfig::from_toml(&example).unwrap(), LedgerConfig::default());
    }
}
