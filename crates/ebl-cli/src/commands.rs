// Command-line surface of the `ebl` binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use tracing::info;

use ebl_core::config::{self, Config};
use ebl_core::db::Database;
use ebl_core::model::{PlayerId, TeamId};
use ebl_league::scoring::score_weeks;

use crate::import;
use crate::weekly;

const SUBMITTED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Parser)]
#[command(name = "ebl", version, about = "Weekly scoring and roster moves for the EBL")]
pub struct Cli {
    /// Directory holding `defaults/` and `config/` (defaults to the working
    /// directory, then the per-user config directory).
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Award weekly category points for every unscored week.
    Score {
        /// Only score the week ending on this Sunday (YYYY-MM-DD).
        #[arg(long)]
        week_end: Option<NaiveDate>,
    },

    /// Resolve every pending roster move request and write the audit record.
    ProcessMoves {
        /// Print the full report as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Submit a team's roster move request, replacing any pending one.
    Submit {
        #[arg(long)]
        team: i64,
        #[arg(long)]
        drop: Option<i64>,
        /// Add choices in priority order (up to three).
        #[arg(long = "add", required = true)]
        adds: Vec<i64>,
        /// Submission time, "YYYY-MM-DD HH:MM:SS" (defaults to now).
        #[arg(long, value_parser = parse_submitted)]
        at: Option<NaiveDateTime>,
    },

    /// Mark a player as gone from the real-world league.
    Deactivate {
        #[arg(long)]
        player: i64,
    },

    /// Import players and rosters from a `player,team,active` CSV.
    ImportRoster { file: PathBuf },

    /// Import daily stat lines from a `date,player,team,offense,pitching` CSV.
    ImportStats { file: PathBuf },
}

fn parse_submitted(raw: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(raw, SUBMITTED_FORMAT)
        .map_err(|e| format!("expected \"YYYY-MM-DD HH:MM:SS\": {e}"))
}

/// Relative paths in the config are taken from the config base directory.
fn resolve(base: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn open_database(base: &Path, config: &Config) -> Result<Database> {
    let path = resolve(base, &config.db_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db = Database::open(&path.to_string_lossy()).context("failed to open database")?;
    info!("database opened at {}", path.display());
    Ok(db)
}

pub async fn run(cli: Cli) -> Result<()> {
    let base = match cli.config_dir {
        Some(dir) => dir,
        None => config::default_base_dir()?,
    };
    let config = config::load_config(&base).context("failed to load configuration")?;
    info!(
        "config loaded: league={} season {}, {} teams",
        config.league.name, config.league.season, config.league.num_teams
    );
    let db = open_database(&base, &config)?;

    match cli.command {
        Command::Score { week_end } => {
            let inserted = score_weeks(&db, &config.scoring.places, week_end)?;
            println!("Inserted {inserted} point rows.");
        }
        Command::ProcessMoves { json } => {
            let report = weekly::run_with_retry(&db, &config.retry).await?;
            let log_dir = resolve(&base, &config.audit.log_dir);
            let path = weekly::write_audit(&report, &log_dir, Local::now().date_naive())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.entries.is_empty() {
                println!("No pending roster move requests.");
            } else {
                println!(
                    "Resolved {} requests ({} processed, {} failed). Log: {}",
                    report.resolved_count(),
                    report.processed_count(),
                    report.failed_count(),
                    path.display()
                );
            }
        }
        Command::Submit {
            team,
            drop,
            adds,
            at,
        } => {
            let submitted = at.unwrap_or_else(|| Local::now().naive_local());
            let adds: Vec<PlayerId> = adds.into_iter().map(PlayerId).collect();
            let request = db.submit_request(TeamId(team), submitted, drop.map(PlayerId), &adds)?;
            println!("Submitted request {request} for team {team}.");
        }
        Command::Deactivate { player } => {
            let teams = db.deactivate_player(PlayerId(player))?;
            if teams.is_empty() {
                println!("Player {player} deactivated.");
            } else {
                let names: Vec<String> = teams.iter().map(ToString::to_string).collect();
                println!(
                    "Player {player} deactivated; empty roster spot opened for team {}.",
                    names.join(", ")
                );
            }
        }
        Command::ImportRoster { file } => {
            let parsed = import::read_roster_file(&file)?;
            let summary = import::import_roster(&db, &parsed, config.league.roster_size)?;
            println!(
                "Imported {} roster rows ({} skipped).",
                summary.imported, summary.skipped
            );
        }
        Command::ImportStats { file } => {
            let parsed = import::read_stat_file(&file)?;
            let summary = import::import_stats(&db, &parsed)?;
            println!(
                "Imported {} stat lines ({} skipped).",
                summary.imported, summary.skipped
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_submit_with_ranked_adds() {
        let cli = Cli::try_parse_from([
            "ebl", "submit", "--team", "3", "--drop", "11", "--add", "20", "--add", "21", "--at",
            "2025-04-12 09:30:00",
        ])
        .unwrap();
        match cli.command {
            Command::Submit {
                team,
                drop,
                adds,
                at,
            } => {
                assert_eq!(team, 3);
                assert_eq!(drop, Some(11));
                assert_eq!(adds, vec![20, 21]);
                assert_eq!(
                    at,
                    Some(
                        NaiveDate::from_ymd_opt(2025, 4, 12)
                            .unwrap()
                            .and_hms_opt(9, 30, 0)
                            .unwrap()
                    )
                );
            }
            other => panic!("expected submit, got {other:?}"),
        }
    }

    #[test]
    fn submit_requires_an_add() {
        assert!(Cli::try_parse_from(["ebl", "submit", "--team", "3"]).is_err());
    }

    #[test]
    fn rejects_badly_formatted_submission_time() {
        let result = Cli::try_parse_from([
            "ebl", "submit", "--team", "3", "--add", "20", "--at", "yesterday",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_config_dir_after_subcommand() {
        let cli = Cli::try_parse_from(["ebl", "score", "--week-end", "2025-04-13", "--config-dir", "/tmp/ebl"])
            .unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/ebl")));
        match cli.command {
            Command::Score { week_end } => {
                assert_eq!(week_end, NaiveDate::from_ymd_opt(2025, 4, 13));
            }
            other => panic!("expected score, got {other:?}"),
        }
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let base = Path::new("/srv/ebl");
        assert_eq!(resolve(base, "ebl.db"), PathBuf::from("/srv/ebl/ebl.db"));
        assert_eq!(resolve(base, "/var/lib/ebl.db"), PathBuf::from("/var/lib/ebl.db"));
    }
}
