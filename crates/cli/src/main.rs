//! Vehicle passport ledger operator binary.
//!
//! # Usage
//!
//! ```bash
//! # Bootstrap a ledger administered by 0xad
//! passport-ledger --state ledger.snap init --admin 0xad
//!
//! # Apply operations; emitted events are printed as JSON lines
//! passport-ledger --state ledger.snap apply ops.json
//!
//! # Inspect state
//! passport-ledger --state ledger.snap show passport 1
//!
//! # Print the configuration schema
//! passport-ledger config schema
//! ```

use std::{io::IsTerminal, process::ExitCode};

use clap::Parser;
use passport_ledger_cli::{
    commands,
    config::{Cli, LogFormat},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let stdout = std::io::stdout();
    match commands::run(cli, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            if let (Some(code), Some(hint)) = (err.code(), err.suggested_action()) {
                eprintln!("  code: {code}");
                eprintln!("  hint: {hint}");
            }
            ExitCode::FAILURE
        },
    }
}

/// Installs the global subscriber. Logs go to stderr; stdout carries command output.
fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = match format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stdout().is_terminal(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
