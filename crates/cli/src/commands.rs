//! Command handlers.
//!
//! Every command that touches the ledger restores it from the state file,
//! runs, and (for mutating commands) writes a fresh snapshot back. Command
//! output goes to the supplied writer; logs go through `tracing`.

use std::{io::Write, path::Path, sync::Arc};

use passport_ledger_state::{EventSink, Ledger, LedgerSnapshot, TracingSink};
use passport_ledger_types::{
    Address, AuthenticatedCaller, EventEntry, Version, WorkshopIdentity, config::LedgerConfig,
};
use serde::Serialize;
use snafu::{ResultExt, ensure};

use crate::{
    config::{
        Cli, CliCommand, ConfigAction, ShowTarget, generate_config_example,
        generate_config_schema, load_ledger_config,
    },
    error::{CliError, OutputSnafu, ReadFileSnafu, ScriptSnafu, SerializeSnafu, StateExistsSnafu},
    script::{self, ApplyOutcome},
};

/// Registry summary printed by `show registry`.
#[derive(Debug, Serialize)]
pub struct RegistrySummary {
    /// Permanent registry admin.
    pub admin: Address,
    /// Current registry version.
    pub version: Version,
    /// Number of directory entries, duplicates included.
    pub workshop_count: u64,
    /// Number of minted passports.
    pub passport_count: u64,
    /// Sequence number of the next event.
    pub next_event_sequence: u64,
    /// Directory entries in registration order.
    pub workshops: Vec<WorkshopIdentity>,
}

impl RegistrySummary {
    fn of(ledger: &Ledger) -> Self {
        Self {
            admin: ledger.admin(),
            version: ledger.registry_version(),
            workshop_count: ledger.workshop_count(),
            passport_count: ledger.passport_count(),
            next_event_sequence: ledger.next_event_sequence(),
            workshops: ledger.workshops(),
        }
    }
}

/// Runs the parsed command, writing its output to `out`.
///
/// # Errors
///
/// Returns the first failure of the command.
pub fn run(cli: Cli, out: &mut impl Write) -> Result<(), CliError> {
    match cli.command {
        CliCommand::Config { action } => {
            let text = match action {
                ConfigAction::Schema => generate_config_schema()?,
                ConfigAction::Example => generate_config_example()?,
            };
            write!(out, "{text}").context(OutputSnafu)
        },
        CliCommand::Init { admin, force } => {
            let config = load_ledger_config(cli.config.as_deref())?;
            init(&cli.state, admin, force, config, out)
        },
        CliCommand::Apply { script, continue_on_error } => {
            let config = load_ledger_config(cli.config.as_deref())?;
            let outcome = apply(&cli.state, &script, continue_on_error, config, out)?;
            if !outcome.failures.is_empty() {
                tracing::warn!(
                    committed = outcome.committed,
                    rejected = outcome.failures.len(),
                    "script finished with rejected operations"
                );
            }
            Ok(())
        },
        CliCommand::Show { target } => {
            let config = load_ledger_config(cli.config.as_deref())?;
            show(&cli.state, target, config, out)
        },
    }
}

/// Bootstraps a ledger administered by `admin` and writes it to `state`.
///
/// Prints the `RegistryCreated` event.
///
/// # Errors
///
/// Returns [`CliError::StateExists`] when `state` exists and `force` is not set.
pub fn init(
    state: &Path,
    admin: Address,
    force: bool,
    config: LedgerConfig,
    out: &mut impl Write,
) -> Result<(), CliError> {
    ensure!(force || !state.exists(), StateExistsSnafu { path: state.display().to_string() });

    let ledger = Ledger::builder()
        .admin(AuthenticatedCaller::new(admin))
        .config(config)
        .sinks(default_sinks())
        .build()?;
    ledger.snapshot().write_to(state)?;
    print_events(&ledger.events_since(0), out)?;
    tracing::info!(state = %state.display(), "ledger initialized");
    Ok(())
}

/// Applies the script at `script` to the ledger stored at `state`.
///
/// The state file is rewritten even when a rejection stops the script, so
/// operations committed before it are kept.
///
/// # Errors
///
/// Returns script, snapshot, and rejection errors.
pub fn apply(
    state: &Path,
    script: &Path,
    continue_on_error: bool,
    config: LedgerConfig,
    out: &mut impl Write,
) -> Result<ApplyOutcome, CliError> {
    let display = script.display().to_string();
    let source = std::fs::read_to_string(script).context(ReadFileSnafu { path: display.clone() })?;
    let ops = script::parse_script(&source).context(ScriptSnafu { path: display })?;

    let ledger = load(state, config, default_sinks())?;
    let result = script::apply(&ledger, ops, continue_on_error, out);
    ledger.snapshot().write_to(state)?;

    let outcome = result?;
    tracing::info!(
        committed = outcome.committed,
        registry_version = %ledger.registry_version(),
        "script applied"
    );
    Ok(outcome)
}

/// Prints `target` from the ledger stored at `state` as pretty JSON.
///
/// # Errors
///
/// Returns [`CliError::NotFound`] for unknown workshops or passports.
pub fn show(
    state: &Path,
    target: ShowTarget,
    config: LedgerConfig,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let ledger = load(state, config, Vec::new())?;
    let json = match target {
        ShowTarget::Registry => serde_json::to_string_pretty(&RegistrySummary::of(&ledger)),
        ShowTarget::Workshop { address } => {
            let workshop = ledger
                .workshop(&address)
                .ok_or_else(|| CliError::NotFound { what: format!("workshop {address}") })?;
            serde_json::to_string_pretty(&workshop)
        },
        ShowTarget::Passport { id } => {
            let view =
                ledger.passport(id).ok_or_else(|| CliError::NotFound { what: id.to_string() })?;
            serde_json::to_string_pretty(&view)
        },
    }
    .context(SerializeSnafu)?;
    writeln!(out, "{json}").context(OutputSnafu)
}

fn load(
    state: &Path,
    config: LedgerConfig,
    sinks: Vec<Arc<dyn EventSink>>,
) -> Result<Ledger, CliError> {
    let snapshot = LedgerSnapshot::read_from(state)?;
    Ok(Ledger::restore(snapshot, config, sinks)?)
}

fn default_sinks() -> Vec<Arc<dyn EventSink>> {
    vec![Arc::new(TracingSink)]
}

fn print_events(entries: &[EventEntry], out: &mut impl Write) -> Result<(), CliError> {
    for entry in entries {
        let line = serde_json::to_string(entry).context(SerializeSnafu)?;
        writeln!(out, "{line}").context(OutputSnafu)?;
    }
    Ok(())
}
