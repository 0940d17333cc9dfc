// The weekly roster move run: one transactional pass, retried as a whole,
// followed by the Markdown audit record.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::{error, info};

use ebl_core::config::RetryConfig;
use ebl_core::db::Database;
use ebl_league::moves::{process_pending_moves, render_markdown, MoveReport};

use crate::retry::retry_with_backoff;

/// Run one pass inside a single `BEGIN IMMEDIATE` transaction.
///
/// Nothing the pass wrote survives an error.
pub fn run_batch(db: &Database) -> Result<MoveReport> {
    db.run_move_batch(|store| process_pending_moves(store))
        .context("roster move batch rolled back")
}

/// Run the batch with bounded retries. A failed attempt has already rolled
/// back, so every retry starts from the same pending state.
pub async fn run_with_retry(db: &Database, policy: &RetryConfig) -> Result<MoveReport> {
    let result = retry_with_backoff(policy, "roster move batch", |attempt| async move {
        info!("roster move batch attempt {attempt}");
        run_batch(db)
    })
    .await;
    if let Err(e) = &result {
        error!("roster move processing aborted: {e:#}");
    }
    result
}

/// Path of the audit file for a run on `run_date`.
pub fn audit_path(log_dir: &Path, run_date: NaiveDate) -> PathBuf {
    log_dir.join(format!("roster-moves-{run_date}.md"))
}

/// Write the audit record, replacing any earlier record for the same day.
pub fn write_audit(report: &MoveReport, log_dir: &Path, run_date: NaiveDate) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let path = audit_path(log_dir, run_date);
    std::fs::write(&path, render_markdown(report, run_date))
        .with_context(|| format!("failed to write audit record {}", path.display()))?;
    info!("wrote audit record to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use ebl_core::model::RequestStatus;

    const ROSTER_SIZE: usize = 4;

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 14).unwrap()
    }

    fn submitted() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 12)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap()
    }

    fn policy() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_backoff_ms: 10,
            max_backoff_ms: 40,
        }
    }

    #[test]
    fn audit_path_is_dated() {
        let path = audit_path(Path::new("logs"), run_date());
        assert_eq!(path, PathBuf::from("logs/roster-moves-2025-04-14.md"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_with_retry_resolves_and_writes_audit() {
        let db = Database::open(":memory:").unwrap();
        let team = db.ensure_team("Vorticists").unwrap();
        let keeper = db.upsert_player("Keeper", true).unwrap();
        let dropped = db.upsert_player("Dropped", true).unwrap();
        db.assign_player(team, keeper, ROSTER_SIZE).unwrap();
        db.assign_player(team, dropped, ROSTER_SIZE).unwrap();
        let target = db.upsert_player("Target", true).unwrap();
        let request = db.submit_request(team, submitted(), Some(dropped), &[target]).unwrap();

        let report = run_with_retry(&db, &policy()).await.unwrap();
        assert_eq!(report.processed_count(), 1);
        assert_eq!(
            db.request(request).unwrap().unwrap().status,
            RequestStatus::Processed
        );

        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let path = write_audit(&report, &log_dir, run_date()).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("## Vorticists"));
        assert!(text.contains("- Add: Target (priority 1)"));
        assert!(text.contains("- Drop: Dropped"));
    }

    #[test]
    fn empty_run_still_writes_a_record() {
        let db = Database::open(":memory:").unwrap();
        let report = run_batch(&db).unwrap();
        let dir = tempfile::tempdir().unwrap();

        let path = write_audit(&report, dir.path(), run_date()).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("No pending roster move requests."));
    }
}
