//! End-to-end runs of parsed command lines.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use clap::Parser;
use passport_ledger_cli::{CliError, commands, config::Cli};
use passport_ledger_test_utils::TestDir;
use passport_ledger_types::ErrorCode;

fn run(args: &[&str]) -> Result<String, CliError> {
    let cli = Cli::try_parse_from(std::iter::once("passport-ledger").chain(args.iter().copied()))
        .expect("valid command line");
    let mut out = Vec::new();
    commands::run(cli, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

#[test]
fn scenario_through_the_command_line() {
    let dir = TestDir::new();
    let state = dir.snapshot_path();
    let state = state.to_str().unwrap();

    run(&["--state", state, "init", "--admin", "0xad"]).unwrap();

    let script = dir.join("ops.json");
    std::fs::write(
        &script,
        r#"[
            {"op": "register_workshop", "caller": "0xaa", "did": "did:web:aa", "public_key_multibase": "z6Mk"},
            {"op": "mint_passport", "caller": "0xbb", "vin": "VIN123", "make": "Acme", "model": "Z1", "year": 2020},
            {"op": "record_intervention", "caller": "0xaa", "passport_id": 1, "odometer_km": 1000,
             "work_type": "oil_change", "notes_hash": "0x01", "evidence_uri": "ipfs://x",
             "workshop_signature": "0x02", "recorded_at_ms": 1700000000000},
            {"op": "set_workshop_status", "caller": "0xad", "workshop": "0xaa", "active": false}
        ]"#,
    )
    .unwrap();
    let printed = run(&["--state", state, "apply", script.to_str().unwrap()]).unwrap();
    let types: Vec<String> = printed
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["event"].as_object().unwrap().keys().next().unwrap().clone()
        })
        .collect();
    assert_eq!(
        types,
        ["workshop_registered", "passport_minted", "intervention_recorded", "workshop_status_changed"]
    );

    let workshop = run(&["--state", state, "show", "workshop", "0xaa"]).unwrap();
    let workshop: serde_json::Value = serde_json::from_str(&workshop).unwrap();
    assert_eq!(workshop["active"], false);

    // Deactivated workshop can no longer record.
    let blocked = dir.join("blocked.json");
    std::fs::write(
        &blocked,
        r#"[{"op": "record_intervention", "caller": "0xaa", "passport_id": 1, "odometer_km": 2000,
             "work_type": "oil_change", "notes_hash": "0x01", "evidence_uri": "ipfs://x",
             "workshop_signature": "0x02", "recorded_at_ms": 1700000000001}]"#,
    )
    .unwrap();
    let err = run(&["--state", state, "apply", blocked.to_str().unwrap()]).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::AuthWorkshopNotActive));

    let passport = run(&["--state", state, "show", "passport", "passport:1"]).unwrap();
    let passport: serde_json::Value = serde_json::from_str(&passport).unwrap();
    assert_eq!(passport["passport"]["latest_odometer_km"], 1000);
    assert_eq!(passport["passport"]["interventions"].as_array().unwrap().len(), 1);
}

#[test]
fn config_file_policies_apply() {
    let dir = TestDir::new();
    let state = dir.snapshot_path();
    let state = state.to_str().unwrap();
    let config = dir.join("ledger.toml");
    std::fs::write(&config, "[mint]\nreject_duplicate_vins = true\n").unwrap();
    let config = config.to_str().unwrap();

    run(&["--state", state, "--config", config, "init", "--admin", "0xad"]).unwrap();
    let script = dir.join("dup.json");
    std::fs::write(
        &script,
        r#"[
            {"op": "mint_passport", "caller": "0xbb", "vin": "VIN123", "make": "Acme", "model": "Z1", "year": 2020},
            {"op": "mint_passport", "caller": "0xcc", "vin": "VIN123", "make": "Acme", "model": "Z1", "year": 2020}
        ]"#,
    )
    .unwrap();

    let err =
        run(&["--state", state, "--config", config, "apply", script.to_str().unwrap()]).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::DomainDuplicateVin));

    let registry = run(&["--state", state, "show", "registry"]).unwrap();
    let registry: serde_json::Value = serde_json::from_str(&registry).unwrap();
    assert_eq!(registry["passport_count"], 1);
}

#[test]
fn config_subcommands_print_without_state() {
    let schema = run(&["config", "schema"]).unwrap();
    assert!(schema.contains("\"LedgerConfig\""));
    let example = run(&["config", "example"]).unwrap();
    assert!(example.contains("[limits]"));
    assert!(example.contains("reject_duplicate_vins = false"));
}
