//! `status` command: store counts and recent pipeline runs.

use chrono::{DateTime, Utc};
use dealdb_db::PipelineRunRow;

/// Format an optional timestamp for display, returning `"-"` when `None`.
fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Wall-clock duration of a finished run, in seconds.
fn duration_secs(run: &PipelineRunRow) -> Option<i64> {
    Some((run.completed_at? - run.started_at?).num_seconds())
}

pub(crate) fn format_run(run: &PipelineRunRow) -> String {
    let duration = duration_secs(run).map_or_else(|| "-".to_string(), |s| format!("{s}s"));
    let error = run
        .error_message
        .as_deref()
        .map(|e| {
            if e.chars().count() > 60 {
                format!("{}...", e.chars().take(60).collect::<String>())
            } else {
                e.to_string()
            }
        })
        .unwrap_or_default();
    format!(
        "{:<7}{:<20}{:<11}{:<11}{:<21}{:<9}{:<9}{}",
        run.id,
        run.stage,
        run.trigger_source,
        run.status,
        fmt_time(run.started_at),
        duration,
        run.records_processed,
        error
    )
}

/// Print raw/deal counts followed by the latest `limit` runs.
///
/// # Errors
///
/// Returns an error if any database query fails.
pub(crate) async fn run_status(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let raw_total = dealdb_db::count_all_raw(pool).await?;
    let raw_pending = dealdb_db::count_unprocessed_raw(pool).await?;
    let deals = dealdb_db::count_deals(pool).await?;

    println!("raw deals: {raw_total} ({raw_pending} unprocessed)");
    println!("deals:     {deals}");
    println!();

    let runs = dealdb_db::list_pipeline_runs(pool, limit).await?;
    if runs.is_empty() {
        println!("no pipeline runs recorded yet");
        return Ok(());
    }

    println!(
        "{:<7}{:<20}{:<11}{:<11}{:<21}{:<9}{:<9}ERROR",
        "ID", "STAGE", "TRIGGER", "STATUS", "STARTED", "TOOK", "RECORDS"
    );
    for run in &runs {
        println!("{}", format_run(run));
    }

    Ok(())
}
