// CSV import of league rosters and daily stat lines.

use std::io::Read;
use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use ebl_core::db::Database;
use ebl_core::model::StatLine;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} has no `{column}` column in its header row")]
    MissingColumn { path: String, column: &'static str },
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One line of a roster file. A blank `team` means the player is not
/// rostered by anyone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterRow {
    pub player: String,
    #[serde(default)]
    pub team: String,
    #[serde(default = "default_active", deserialize_with = "flag")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Accepts `1`/`0`, `true`/`false` and `yes`/`no`.
fn flag<'de, D: serde::Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(de)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid active flag '{other}'"))),
    }
}

/// One player's production for one day. The line is credited to the team
/// named in the file as given; the player's current roster is not consulted,
/// since they may have moved since that day.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatRow {
    pub date: NaiveDate,
    pub player: String,
    pub team: String,
    #[serde(default)]
    pub offense: i64,
    #[serde(default)]
    pub pitching: i64,
}

const ROSTER_COLUMNS: &[&str] = &["player"];
const STAT_COLUMNS: &[&str] = &["date", "player", "team"];

/// Rows that parsed, plus how many data rows were malformed and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRows<T> {
    pub rows: Vec<T>,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// Reader-based parsing
// ---------------------------------------------------------------------------

/// Parse every data row of a CSV with a header row.
///
/// An unreadable header, or one lacking a `required` column, fails the whole
/// read. Data rows that do not deserialize are skipped with a warning and
/// counted.
fn read_rows<R: Read, T: serde::de::DeserializeOwned>(
    rdr: R,
    origin: &str,
    required: &[&'static str],
) -> Result<CsvRows<T>, ImportError> {
    let csv_error = |source| ImportError::Csv {
        path: origin.to_string(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);

    let headers = reader.headers().map_err(csv_error)?;
    if let Some(column) = required.iter().copied().find(|c| !headers.iter().any(|h| h == *c)) {
        return Err(ImportError::MissingColumn {
            path: origin.to_string(),
            column,
        });
    }

    let mut parsed = CsvRows {
        rows: Vec::new(),
        skipped: 0,
    };
    for result in reader.deserialize::<T>() {
        match result {
            Ok(row) => parsed.rows.push(row),
            Err(e) => {
                warn!("{origin}: skipping malformed row: {e}");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

/// Parse a `player,team,active` roster. `origin` names the input in errors.
pub fn read_roster_rows<R: Read>(rdr: R, origin: &str) -> Result<CsvRows<RosterRow>, ImportError> {
    read_rows(rdr, origin, ROSTER_COLUMNS)
}

/// Parse a `date,player,team,offense,pitching` stat file.
pub fn read_stat_rows<R: Read>(rdr: R, origin: &str) -> Result<CsvRows<StatRow>, ImportError> {
    read_rows(rdr, origin, STAT_COLUMNS)
}

fn open_file(path: &Path) -> Result<std::fs::File, ImportError> {
    std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn read_roster_file(path: &Path) -> Result<CsvRows<RosterRow>, ImportError> {
    read_roster_rows(open_file(path)?, &path.display().to_string())
}

pub fn read_stat_file(path: &Path) -> Result<CsvRows<StatRow>, ImportError> {
    read_stat_rows(open_file(path)?, &path.display().to_string())
}

// ---------------------------------------------------------------------------
// Loading into the database
// ---------------------------------------------------------------------------

/// Create or update players and put them on their teams.
///
/// Rows whose assignment the league rules reject (inactive player, player
/// already on another team, full roster) are skipped with a warning. A
/// player already on the named team counts as imported. Rows dropped while
/// parsing count as skipped.
pub fn import_roster(
    db: &Database,
    parsed: &CsvRows<RosterRow>,
    roster_size: usize,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        imported: 0,
        skipped: parsed.skipped,
    };
    for row in &parsed.rows {
        if row.player.is_empty() {
            warn!("skipping roster row without a player name");
            summary.skipped += 1;
            continue;
        }
        let player = db.upsert_player(&row.player, row.active)?;
        if row.team.is_empty() {
            summary.imported += 1;
            continue;
        }

        let team = db.ensure_team(&row.team)?;
        if db.player_team(player)? == Some(team) {
            summary.imported += 1;
            continue;
        }
        match db.assign_player(team, player, roster_size) {
            Ok(()) => summary.imported += 1,
            Err(e) => {
                warn!("skipping {} on {}: {e}", row.player, row.team);
                summary.skipped += 1;
            }
        }
    }
    info!(
        "roster import: {} rows imported, {} skipped",
        summary.imported, summary.skipped
    );
    Ok(summary)
}

/// Record stat lines for known players and teams. Rows naming an unknown
/// player or team are skipped with a warning, as are rows dropped while
/// parsing.
pub fn import_stats(db: &Database, parsed: &CsvRows<StatRow>) -> Result<ImportSummary> {
    let mut summary = ImportSummary {
        imported: 0,
        skipped: parsed.skipped,
    };
    for row in &parsed.rows {
        let Some(player) = db.player_by_name(&row.player)? else {
            warn!("skipping stat line for unknown player '{}'", row.player);
            summary.skipped += 1;
            continue;
        };
        let Some(team) = db.team_by_name(&row.team)? else {
            warn!("skipping stat line for unknown team '{}'", row.team);
            summary.skipped += 1;
            continue;
        };
        db.record_stat(&StatLine {
            player_id: player.id,
            team_id: team,
            date: row.date,
            offense: row.offense,
            pitching: row.pitching,
        })?;
        summary.imported += 1;
    }
    info!(
        "stat import: {} rows imported, {} skipped",
        summary.imported, summary.skipped
    );
    Ok(summary)
}
