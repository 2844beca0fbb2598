use chrono::{TimeZone, Utc};
use dealdb_db::PipelineRunRow;
use uuid::Uuid;

use super::*;

#[test]
fn parses_migrate_command() {
    let cli = Cli::try_parse_from(["dealdb-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Migrate)));
}

#[test]
fn command_names_label_failure_logs() {
    let cli = Cli::try_parse_from(["dealdb-cli", "embed", "--batch-size", "2"]).unwrap();
    assert_eq!(cli.command.expect("command").name(), "embed");
    let cli = Cli::try_parse_from(["dealdb-cli", "status"]).unwrap();
    assert_eq!(cli.command.expect("command").name(), "status");
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["dealdb-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn extract_batch_size_defaults_to_none() {
    let cli = Cli::try_parse_from(["dealdb-cli", "extract"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Extract { batch_size: None })
    ));
}

#[test]
fn extract_accepts_batch_size() {
    let cli = Cli::try_parse_from(["dealdb-cli", "extract", "--batch-size", "5"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Extract {
            batch_size: Some(5)
        })
    ));
}

#[test]
fn embed_accepts_batch_size() {
    let cli = Cli::try_parse_from(["dealdb-cli", "embed", "--batch-size", "2"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Embed {
            batch_size: Some(2)
        })
    ));
}

#[test]
fn status_limit_defaults_to_ten() {
    let cli = Cli::try_parse_from(["dealdb-cli", "status"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Status { limit: 10 })));
}

#[test]
fn ingest_and_retain_take_no_arguments() {
    assert!(matches!(
        Cli::try_parse_from(["dealdb-cli", "ingest"]).unwrap().command,
        Some(Commands::Ingest)
    ));
    assert!(matches!(
        Cli::try_parse_from(["dealdb-cli", "retain"]).unwrap().command,
        Some(Commands::Retain)
    ));
    assert!(Cli::try_parse_from(["dealdb-cli", "retain", "--batch-size", "1"]).is_err());
}

#[test]
fn unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["dealdb-cli", "scrape"]).is_err());
}

#[test]
fn batch_size_flag_overrides_default() {
    assert_eq!(resolve_batch_size(None, 3).unwrap(), 3);
    assert_eq!(resolve_batch_size(Some(7), 3).unwrap(), 7);
    assert!(resolve_batch_size(Some(0), 3).is_err());
}

#[test]
fn format_run_shows_duration_and_truncates_errors() {
    let started = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let run = PipelineRunRow {
        id: 4,
        public_id: Uuid::nil(),
        stage: "extraction".to_string(),
        trigger_source: "cli".to_string(),
        status: "failed".to_string(),
        started_at: Some(started),
        completed_at: Some(started + chrono::Duration::seconds(42)),
        records_processed: 0,
        error_message: Some("x".repeat(80)),
        summary: serde_json::json!({}),
        created_at: started,
    };

    let line = status::format_run(&run);
    assert!(line.starts_with("4      extraction"));
    assert!(line.contains("2025-03-01 12:00:00"));
    assert!(line.contains("42s"));
    assert!(line.ends_with(&format!("{}...", "x".repeat(60))));
}
