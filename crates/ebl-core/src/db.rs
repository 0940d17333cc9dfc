// SQLite persistence layer for the league.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::model::{
    FailureReason, MoveRequest, Outcome, Player, PlayerId, PointAward, RequestError, RequestId,
    RequestLine, RequestStatus, StatLine, Team, TeamId, MAX_ADD_CHOICES,
};
use crate::store::{MoveStore, PendingRequest};

/// Stored state of a request, including its resolution record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub id: RequestId,
    pub team_id: TeamId,
    pub submitted: NaiveDateTime,
    pub status: RequestStatus,
    pub failure_reason: Option<FailureReason>,
    pub added_player_id: Option<PlayerId>,
    pub dropped_player_id: Option<PlayerId>,
    pub resolved_at: Option<NaiveDateTime>,
}

/// SQLite-backed store for teams, players, rosters, stats, points and
/// roster move requests.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS teams (
                id                    INTEGER PRIMARY KEY AUTOINCREMENT,
                name                  TEXT NOT NULL UNIQUE,
                has_empty_roster_spot INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS players (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                name      TEXT NOT NULL UNIQUE,
                is_active INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS team_player (
                team_id   INTEGER NOT NULL REFERENCES teams(id),
                player_id INTEGER NOT NULL UNIQUE REFERENCES players(id),
                PRIMARY KEY (team_id, player_id)
            );

            CREATE TABLE IF NOT EXISTS stats (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id INTEGER NOT NULL REFERENCES players(id),
                team_id   INTEGER NOT NULL REFERENCES teams(id),
                date      TEXT NOT NULL,
                offense   INTEGER NOT NULL DEFAULT 0,
                pitching  INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS points (
                id       INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id  INTEGER NOT NULL REFERENCES teams(id),
                week_end TEXT NOT NULL,
                value    INTEGER NOT NULL,
                category TEXT NOT NULL CHECK (category IN ('offense', 'pitching'))
            );

            CREATE TABLE IF NOT EXISTS roster_move_requests (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id   INTEGER NOT NULL REFERENCES teams(id),
                submitted TEXT NOT NULL,
                status    TEXT NOT NULL DEFAULT 'pending'
                          CHECK (status IN ('pending', 'processed', 'failed', 'superseded'))
            );

            CREATE TABLE IF NOT EXISTS roster_move_request_players (
                id                     INTEGER PRIMARY KEY AUTOINCREMENT,
                roster_move_request_id INTEGER NOT NULL REFERENCES roster_move_requests(id),
                player_id              INTEGER NOT NULL REFERENCES players(id),
                action                 TEXT NOT NULL CHECK (action IN ('add', 'drop')),
                priority               INTEGER CHECK (priority IN (1, 2, 3)),
                UNIQUE (roster_move_request_id, player_id)
            );
            ",
        )
        .context("failed to create database schema")?;

        // Resolution record columns arrived after the first schema; older
        // databases get them added in place.
        for (column, decl) in [
            ("resolved_at", "TEXT"),
            ("failure_reason", "TEXT"),
            ("added_player_id", "INTEGER REFERENCES players(id)"),
            ("dropped_player_id", "INTEGER REFERENCES players(id)"),
        ] {
            Self::add_column_if_missing(&conn, "roster_move_requests", column, decl)?;
        }

        conn.execute_batch(
            "CREATE INDEX IF NOT EXISTS idx_requests_team_status
                 ON roster_move_requests(team_id, status);
             CREATE INDEX IF NOT EXISTS idx_stats_date ON stats(date);
             CREATE INDEX IF NOT EXISTS idx_points_week_end ON points(week_end);",
        )
        .context("failed to create indexes")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Add `column` to `table` unless a probe query shows it is already there.
    fn add_column_if_missing(conn: &Connection, table: &str, column: &str, decl: &str) -> Result<()> {
        let exists = conn
            .prepare(&format!("SELECT {column} FROM {table} LIMIT 0"))
            .is_ok();
        if exists {
            return Ok(());
        }
        conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl};"))
            .with_context(|| format!("failed to add column {table}.{column}"))?;
        info!("migrated {table}: added column {column}");
        Ok(())
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Teams and players
    // ------------------------------------------------------------------

    /// Insert a team by name, or return the existing team's id.
    pub fn ensure_team(&self, name: &str) -> Result<TeamId> {
        let conn = self.conn();
        let id = conn
            .query_row(
                "INSERT INTO teams (name) VALUES (?1)
                 ON CONFLICT(name) DO UPDATE SET name = excluded.name
                 RETURNING id",
                params![name],
                |row| row.get(0),
            )
            .context("failed to upsert team")?;
        Ok(id)
    }

    pub fn team(&self, id: TeamId) -> Result<Option<Team>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, has_empty_roster_spot FROM teams WHERE id = ?1",
            params![id],
            |row| {
                Ok(Team {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    has_empty_roster_spot: row.get(2)?,
                })
            },
        )
        .optional()
        .context("failed to load team")
    }

    /// All teams ordered by id.
    pub fn teams(&self) -> Result<Vec<Team>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, name, has_empty_roster_spot FROM teams ORDER BY id")
            .context("failed to prepare teams query")?;
        let teams = stmt
            .query_map([], |row| {
                Ok(Team {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    has_empty_roster_spot: row.get(2)?,
                })
            })
            .context("failed to query teams")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map team rows")?;
        Ok(teams)
    }

    /// Insert a player or update the active flag of an existing player with
    /// the same name. Returns the player's row id.
    pub fn upsert_player(&self, name: &str, active: bool) -> Result<PlayerId> {
        let conn = self.conn();
        let id = conn
            .query_row(
                "INSERT INTO players (name, is_active) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET is_active = excluded.is_active
                 RETURNING id",
                params![name, active],
                |row| row.get(0),
            )
            .context("failed to upsert player")?;
        Ok(id)
    }

    pub fn player(&self, id: PlayerId) -> Result<Option<Player>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, is_active FROM players WHERE id = ?1",
            params![id],
            |row| {
                Ok(Player {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    active: row.get(2)?,
                })
            },
        )
        .optional()
        .context("failed to load player")
    }

    pub fn player_by_name(&self, name: &str) -> Result<Option<Player>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, name, is_active FROM players WHERE name = ?1",
            params![name],
            |row| {
                Ok(Player {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    active: row.get(2)?,
                })
            },
        )
        .optional()
        .context("failed to look up player by name")
    }

    pub fn team_by_name(&self, name: &str) -> Result<Option<TeamId>> {
        let conn = self.conn();
        conn.query_row("SELECT id FROM teams WHERE name = ?1", params![name], |row| {
            row.get(0)
        })
        .optional()
        .context("failed to look up team by name")
    }

    /// The team currently rostering `player`, if any.
    pub fn player_team(&self, player: PlayerId) -> Result<Option<TeamId>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT team_id FROM team_player WHERE player_id = ?1",
            params![player],
            |row| row.get(0),
        )
        .optional()
        .context("failed to look up player's team")
    }

    /// Put `player` on `team`.
    ///
    /// Fails if the player is inactive, already on a team, or the team
    /// already carries `roster_size` players.
    pub fn assign_player(&self, team: TeamId, player: PlayerId, roster_size: usize) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;

        let active: Option<bool> = tx
            .query_row(
                "SELECT is_active FROM players WHERE id = ?1",
                params![player],
                |row| row.get(0),
            )
            .optional()
            .context("failed to load player")?;
        match active {
            None => bail!("player {player} does not exist"),
            Some(false) => bail!("player {player} is inactive"),
            Some(true) => {}
        }

        let owner: Option<TeamId> = tx
            .query_row(
                "SELECT team_id FROM team_player WHERE player_id = ?1",
                params![player],
                |row| row.get(0),
            )
            .optional()
            .context("failed to look up player's team")?;
        if let Some(owner) = owner {
            bail!("player {player} is already on team {owner}");
        }

        let count: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM team_player WHERE team_id = ?1",
                params![team],
                |row| row.get(0),
            )
            .context("failed to count roster")?;
        if count as usize >= roster_size {
            bail!("team {team} already has {count} players (roster size {roster_size})");
        }

        tx.execute(
            "INSERT INTO team_player (team_id, player_id) VALUES (?1, ?2)",
            params![team, player],
        )
        .context("failed to assign player")?;
        tx.commit().context("failed to commit assign_player")?;
        Ok(())
    }

    /// Players on `team`, ordered by name.
    pub fn team_roster(&self, team: TeamId) -> Result<Vec<Player>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT p.id, p.name, p.is_active
                 FROM team_player tp
                 JOIN players p ON p.id = tp.player_id
                 WHERE tp.team_id = ?1
                 ORDER BY p.name",
            )
            .context("failed to prepare roster query")?;
        let players = stmt
            .query_map(params![team], |row| {
                Ok(Player {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    active: row.get(2)?,
                })
            })
            .context("failed to query roster")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map roster rows")?;
        Ok(players)
    }

    /// Active players not on any team, ordered by name.
    pub fn available_players(&self) -> Result<Vec<Player>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT p.id, p.name, p.is_active
                 FROM players p
                 LEFT JOIN team_player tp ON tp.player_id = p.id
                 WHERE p.is_active = 1 AND tp.player_id IS NULL
                 ORDER BY p.name",
            )
            .context("failed to prepare available players query")?;
        let players = stmt
            .query_map([], |row| {
                Ok(Player {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    active: row.get(2)?,
                })
            })
            .context("failed to query available players")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map available player rows")?;
        Ok(players)
    }

    /// Record that a player left the real-world roster.
    ///
    /// The player becomes inactive, any team that rostered them loses them
    /// and gets an empty roster spot. Returns the affected teams.
    pub fn deactivate_player(&self, player: PlayerId) -> Result<Vec<TeamId>> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;

        let changed = tx
            .execute("UPDATE players SET is_active = 0 WHERE id = ?1", params![player])
            .context("failed to deactivate player")?;
        if changed == 0 {
            bail!("player {player} does not exist");
        }

        let teams: Vec<TeamId> = {
            let mut stmt = tx
                .prepare("SELECT team_id FROM team_player WHERE player_id = ?1")
                .context("failed to prepare owner query")?;
            let rows = stmt
                .query_map(params![player], |row| row.get::<_, TeamId>(0))
                .context("failed to query owners")?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("failed to map owner rows")?;
            rows
        };

        tx.execute(
            "UPDATE teams SET has_empty_roster_spot = 1
             WHERE id IN (SELECT team_id FROM team_player WHERE player_id = ?1)",
            params![player],
        )
        .context("failed to open roster spots")?;
        tx.execute("DELETE FROM team_player WHERE player_id = ?1", params![player])
            .context("failed to remove deactivated player from rosters")?;

        tx.commit().context("failed to commit deactivate_player")?;
        Ok(teams)
    }

    // ------------------------------------------------------------------
    // Stats and points
    // ------------------------------------------------------------------

    pub fn record_stat(&self, stat: &StatLine) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO stats (player_id, team_id, date, offense, pitching)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![stat.player_id, stat.team_id, stat.date, stat.offense, stat.pitching],
        )
        .context("failed to record stat line")?;
        Ok(())
    }

    /// Every recorded stat line, ordered by date.
    pub fn stat_lines(&self) -> Result<Vec<StatLine>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player_id, team_id, date, offense, pitching
                 FROM stats ORDER BY date, id",
            )
            .context("failed to prepare stats query")?;
        let lines = stmt
            .query_map([], |row| {
                Ok(StatLine {
                    player_id: row.get(0)?,
                    team_id: row.get(1)?,
                    date: row.get(2)?,
                    offense: row.get(3)?,
                    pitching: row.get(4)?,
                })
            })
            .context("failed to query stats")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map stat rows")?;
        Ok(lines)
    }

    /// Whether any points were already awarded for the week ending on `week_end`.
    pub fn points_recorded_for(&self, week_end: NaiveDate) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM points WHERE week_end = ?1)",
                params![week_end],
                |row| row.get(0),
            )
            .context("failed to check points existence")?;
        Ok(exists)
    }

    /// Insert point awards in a single transaction. Returns the row count.
    pub fn insert_points(&self, awards: &[PointAward]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin points transaction")?;
        for award in awards {
            tx.execute(
                "INSERT INTO points (team_id, week_end, value, category)
                 VALUES (?1, ?2, ?3, ?4)",
                params![award.team_id, award.week_end, award.value, award.category],
            )
            .context("failed to insert point award")?;
        }
        tx.commit().context("failed to commit points")?;
        Ok(awards.len())
    }

    pub fn season_points(&self) -> Result<HashMap<TeamId, i64>> {
        query_season_points(&self.conn())
    }

    // ------------------------------------------------------------------
    // Roster move requests
    // ------------------------------------------------------------------

    /// Submit a team's weekly request. `adds` are ranked in the given order
    /// (first is priority 1).
    ///
    /// Any request the team still has pending is marked `superseded` in the
    /// same transaction, so at most one request per team is ever pending.
    /// Shape violations come back as a [`RequestError`] inside the error.
    pub fn submit_request(
        &self,
        team: TeamId,
        submitted: NaiveDateTime,
        drop: Option<PlayerId>,
        adds: &[PlayerId],
    ) -> Result<RequestId> {
        if adds.is_empty() {
            return Err(RequestError::NoAdds.into());
        }
        if adds.len() > MAX_ADD_CHOICES {
            return Err(RequestError::TooManyAdds { count: adds.len() }.into());
        }

        let mut lines: Vec<RequestLine> = drop
            .map(|id| RequestLine::drop(id, String::new()))
            .into_iter()
            .collect();
        for (idx, &id) in adds.iter().enumerate() {
            lines.push(RequestLine::add(id, String::new(), (idx + 1) as u8));
        }
        MoveRequest::from_lines(RequestId(0), team, submitted, lines.clone())?;

        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin submit transaction")?;

        let team_exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM teams WHERE id = ?1)",
                params![team],
                |row| row.get(0),
            )
            .context("failed to check team existence")?;
        if !team_exists {
            bail!("team {team} does not exist");
        }

        let superseded = tx
            .execute(
                "UPDATE roster_move_requests SET status = 'superseded'
                 WHERE team_id = ?1 AND status = 'pending'",
                params![team],
            )
            .context("failed to supersede pending requests")?;

        let request_id: RequestId = tx
            .query_row(
                "INSERT INTO roster_move_requests (team_id, submitted, status)
                 VALUES (?1, ?2, 'pending')
                 RETURNING id",
                params![team, submitted],
                |row| row.get(0),
            )
            .context("failed to insert request")?;

        for line in &lines {
            tx.execute(
                "INSERT INTO roster_move_request_players
                    (roster_move_request_id, player_id, action, priority)
                 VALUES (?1, ?2, ?3, ?4)",
                params![request_id, line.player_id, line.action, line.priority],
            )
            .context("failed to insert request line")?;
        }

        tx.commit().context("failed to commit submit_request")?;
        debug!("team {team} submitted request {request_id} ({superseded} superseded)");
        Ok(request_id)
    }

    pub fn request(&self, id: RequestId) -> Result<Option<RequestRecord>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, team_id, submitted, status, failure_reason,
                    added_player_id, dropped_player_id, resolved_at
             FROM roster_move_requests WHERE id = ?1",
            params![id],
            |row| {
                Ok(RequestRecord {
                    id: row.get(0)?,
                    team_id: row.get(1)?,
                    submitted: row.get(2)?,
                    status: row.get(3)?,
                    failure_reason: row.get(4)?,
                    added_player_id: row.get(5)?,
                    dropped_player_id: row.get(6)?,
                    resolved_at: row.get(7)?,
                })
            },
        )
        .optional()
        .context("failed to load request")
    }

    pub fn request_lines(&self, id: RequestId) -> Result<Vec<RequestLine>> {
        query_request_lines(&self.conn(), id)
    }

    /// Run `f` against the move store inside one `BEGIN IMMEDIATE`
    /// transaction. Commits only if `f` returns `Ok`; otherwise every write
    /// it made is rolled back.
    ///
    /// IMMEDIATE takes the write lock up front, so a second concurrent run
    /// waits (up to `busy_timeout`) or fails instead of interleaving.
    pub fn run_move_batch<T>(&self, f: impl FnOnce(&mut MoveTx<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin roster move transaction")?;
        let mut store = MoveTx { tx };
        let value = f(&mut store)?;
        store.tx.commit().context("failed to commit roster moves")?;
        Ok(value)
    }
}

// ----------------------------------------------------------------------
// Transactional move store
// ----------------------------------------------------------------------

/// [`MoveStore`] over an open SQLite transaction.
pub struct MoveTx<'conn> {
    tx: Transaction<'conn>,
}

impl MoveStore for MoveTx<'_> {
    fn season_points(&self) -> Result<HashMap<TeamId, i64>> {
        query_season_points(&self.tx)
    }

    fn pending_requests(&self) -> Result<Vec<PendingRequest>> {
        let mut stmt = self
            .tx
            .prepare(
                "SELECT r.id, r.submitted, t.id, t.name, t.has_empty_roster_spot
                 FROM roster_move_requests r
                 JOIN teams t ON t.id = r.team_id
                 WHERE r.status = 'pending'
                 ORDER BY r.team_id, r.submitted DESC, r.id DESC",
            )
            .context("failed to prepare pending requests query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, RequestId>(0)?,
                    row.get::<_, NaiveDateTime>(1)?,
                    Team {
                        id: row.get(2)?,
                        name: row.get(3)?,
                        has_empty_roster_spot: row.get(4)?,
                    },
                ))
            })
            .context("failed to query pending requests")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map pending request rows")?;

        let mut pending: Vec<PendingRequest> = Vec::new();
        for (request_id, submitted, team) in rows {
            // Rows are newest-first within a team; keep only the first.
            if pending.last().is_some_and(|p| p.team.id == team.id) {
                continue;
            }
            let lines = query_request_lines(&self.tx, request_id)?;
            pending.push(PendingRequest {
                request_id,
                team,
                submitted,
                lines,
            });
        }
        Ok(pending)
    }

    fn available_players(&self) -> Result<BTreeSet<PlayerId>> {
        let mut stmt = self
            .tx
            .prepare(
                "SELECT p.id
                 FROM players p
                 LEFT JOIN team_player tp ON tp.player_id = p.id
                 WHERE p.is_active = 1 AND tp.player_id IS NULL",
            )
            .context("failed to prepare available pool query")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, PlayerId>(0))
            .context("failed to query available pool")?
            .collect::<std::result::Result<BTreeSet<_>, _>>()
            .context("failed to map available pool rows")?;
        Ok(ids)
    }

    fn team_roster(&self, team: TeamId) -> Result<BTreeSet<PlayerId>> {
        let mut stmt = self
            .tx
            .prepare("SELECT player_id FROM team_player WHERE team_id = ?1")
            .context("failed to prepare roster ids query")?;
        let ids = stmt
            .query_map(params![team], |row| row.get::<_, PlayerId>(0))
            .context("failed to query roster ids")?
            .collect::<std::result::Result<BTreeSet<_>, _>>()
            .context("failed to map roster id rows")?;
        Ok(ids)
    }

    fn record_outcome(&mut self, request: RequestId, outcome: &Outcome) -> Result<()> {
        let (reason, added, dropped) = match outcome {
            Outcome::Processed { added, dropped } => (
                None,
                Some(added.player_id),
                dropped.as_ref().map(|d| d.player_id),
            ),
            Outcome::Failed { reason } => (Some(*reason), None, None),
        };
        let changed = self
            .tx
            .execute(
                "UPDATE roster_move_requests
                 SET status = ?2,
                     failure_reason = ?3,
                     added_player_id = ?4,
                     dropped_player_id = ?5,
                     resolved_at = strftime('%Y-%m-%d %H:%M:%S', 'now')
                 WHERE id = ?1 AND status = 'pending'",
                params![request, outcome.status(), reason, added, dropped],
            )
            .context("failed to record request outcome")?;
        if changed != 1 {
            bail!("request {request} is no longer pending");
        }
        Ok(())
    }

    fn apply_move(&mut self, team: TeamId, drop: Option<PlayerId>, add: PlayerId) -> Result<()> {
        if let Some(drop) = drop {
            let removed = self
                .tx
                .execute(
                    "DELETE FROM team_player WHERE team_id = ?1 AND player_id = ?2",
                    params![team, drop],
                )
                .context("failed to drop player")?;
            if removed != 1 {
                bail!("player {drop} is not on team {team}");
            }
        }
        self.tx
            .execute(
                "INSERT INTO team_player (team_id, player_id) VALUES (?1, ?2)",
                params![team, add],
            )
            .context("failed to add player")?;
        Ok(())
    }

    fn set_empty_roster_spot(&mut self, team: TeamId, empty: bool) -> Result<()> {
        self.tx
            .execute(
                "UPDATE teams SET has_empty_roster_spot = ?2 WHERE id = ?1",
                params![team, empty],
            )
            .context("failed to update empty roster spot flag")?;
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Shared queries
// ----------------------------------------------------------------------

fn query_season_points(conn: &Connection) -> Result<HashMap<TeamId, i64>> {
    let mut stmt = conn
        .prepare(
            "SELECT t.id, COALESCE(SUM(p.value), 0)
             FROM teams t
             LEFT JOIN points p ON p.team_id = t.id
             GROUP BY t.id",
        )
        .context("failed to prepare season points query")?;
    let points = stmt
        .query_map([], |row| Ok((row.get::<_, TeamId>(0)?, row.get::<_, i64>(1)?)))
        .context("failed to query season points")?
        .collect::<std::result::Result<HashMap<_, _>, _>>()
        .context("failed to map season point rows")?;
    Ok(points)
}

fn query_request_lines(conn: &Connection, request: RequestId) -> Result<Vec<RequestLine>> {
    let mut stmt = conn
        .prepare(
            "SELECT rmp.player_id, p.name, rmp.action, rmp.priority
             FROM roster_move_request_players rmp
             JOIN players p ON p.id = rmp.player_id
             WHERE rmp.roster_move_request_id = ?1
             ORDER BY rmp.action DESC, rmp.priority",
        )
        .context("failed to prepare request lines query")?;
    let lines = stmt
        .query_map(params![request], |row| {
            Ok(RequestLine {
                player_id: row.get(0)?,
                player_name: row.get(1)?,
                action: row.get(2)?,
                priority: row.get(3)?,
            })
        })
        .context("failed to query request lines")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to map request line rows")?;
    Ok(lines)
}
