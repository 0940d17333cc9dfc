// League domain model: teams, players, roster move requests, stats and points.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of ranked add choices on a single request.
pub const MAX_ADD_CHOICES: usize = 3;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.0))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

id_type!(
    /// Row id of a team.
    TeamId
);
id_type!(
    /// Row id of a player.
    PlayerId
);
id_type!(
    /// Row id of a roster move request.
    RequestId
);

/// A string column held a value outside the enum's vocabulary.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

/// Text-backed enums share the same SQLite mapping.
macro_rules! text_enum_sql {
    ($name:ident) => {
        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: UnknownValue| FromSqlError::Other(Box::new(e)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Teams and players
// ---------------------------------------------------------------------------

/// A franchise in the league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// True when the team is short a player because someone left the pool
    /// outside the weekly move process.
    pub has_empty_roster_spot: bool,
}

/// A person eligible for roster assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Still on the real-world parent roster.
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Processed,
    Failed,
    Superseded,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Processed => "processed",
            RequestStatus::Failed => "failed",
            RequestStatus::Superseded => "superseded",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "processed" => Ok(RequestStatus::Processed),
            "failed" => Ok(RequestStatus::Failed),
            "superseded" => Ok(RequestStatus::Superseded),
            other => Err(UnknownValue {
                kind: "request status",
                value: other.to_string(),
            }),
        }
    }
}

text_enum_sql!(RequestStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveAction {
    Add,
    Drop,
}

impl MoveAction {
    pub fn as_str(self) -> &'static str {
        match self {
            MoveAction::Add => "add",
            MoveAction::Drop => "drop",
        }
    }
}

impl FromStr for MoveAction {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "add" => Ok(MoveAction::Add),
            "drop" => Ok(MoveAction::Drop),
            other => Err(UnknownValue {
                kind: "move action",
                value: other.to_string(),
            }),
        }
    }
}

text_enum_sql!(MoveAction);

/// One stored line item of a request, exactly as the store holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestLine {
    pub player_id: PlayerId,
    pub player_name: String,
    pub action: MoveAction,
    pub priority: Option<u8>,
}

impl RequestLine {
    pub fn drop(player_id: PlayerId, player_name: impl Into<String>) -> Self {
        Self {
            player_id,
            player_name: player_name.into(),
            action: MoveAction::Drop,
            priority: None,
        }
    }

    pub fn add(player_id: PlayerId, player_name: impl Into<String>, priority: u8) -> Self {
        Self {
            player_id,
            player_name: player_name.into(),
            action: MoveAction::Add,
            priority: Some(priority),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropChoice {
    pub player_id: PlayerId,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddChoice {
    pub player_id: PlayerId,
    pub player_name: String,
    /// Rank 1..=3; lower is preferred.
    pub priority: u8,
}

/// Shape violations in a request's line items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("a request may drop at most one player")]
    MultipleDrops,

    #[error("a request may rank at most 3 adds, got {count}")]
    TooManyAdds { count: usize },

    #[error("a request must rank at least one add")]
    NoAdds,

    #[error("add of player {player} has no priority")]
    MissingPriority { player: PlayerId },

    #[error("add of player {player} has priority {priority}, expected 1 to 3")]
    PriorityOutOfRange { player: PlayerId, priority: u8 },

    #[error("priority {priority} is used by more than one add")]
    DuplicatePriority { priority: u8 },

    #[error("drop of player {player} must not carry a priority")]
    DropWithPriority { player: PlayerId },

    #[error("player {player} appears on more than one line")]
    DuplicatePlayer { player: PlayerId },
}

/// A team's weekly move submission with validated line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub id: RequestId,
    pub team_id: TeamId,
    pub submitted: NaiveDateTime,
    pub drop: Option<DropChoice>,
    /// Sorted by ascending priority.
    pub adds: Vec<AddChoice>,
}

impl MoveRequest {
    /// Build a request from raw line items, enforcing at most one drop and
    /// adds with distinct priorities in 1..=3.
    ///
    /// An empty add list is accepted here; it simply never finds an available
    /// player. Intake rejects it separately.
    pub fn from_lines(
        id: RequestId,
        team_id: TeamId,
        submitted: NaiveDateTime,
        lines: Vec<RequestLine>,
    ) -> Result<Self, RequestError> {
        let mut seen_players = HashSet::new();
        let mut seen_priorities = HashSet::new();
        let mut drop = None;
        let mut adds = Vec::new();

        for line in lines {
            if !seen_players.insert(line.player_id) {
                return Err(RequestError::DuplicatePlayer {
                    player: line.player_id,
                });
            }
            match line.action {
                MoveAction::Drop => {
                    if line.priority.is_some() {
                        return Err(RequestError::DropWithPriority {
                            player: line.player_id,
                        });
                    }
                    if drop.is_some() {
                        return Err(RequestError::MultipleDrops);
                    }
                    drop = Some(DropChoice {
                        player_id: line.player_id,
                        player_name: line.player_name,
                    });
                }
                MoveAction::Add => {
                    let priority = line.priority.ok_or(RequestError::MissingPriority {
                        player: line.player_id,
                    })?;
                    if priority == 0 || usize::from(priority) > MAX_ADD_CHOICES {
                        return Err(RequestError::PriorityOutOfRange {
                            player: line.player_id,
                            priority,
                        });
                    }
                    if !seen_priorities.insert(priority) {
                        return Err(RequestError::DuplicatePriority { priority });
                    }
                    adds.push(AddChoice {
                        player_id: line.player_id,
                        player_name: line.player_name,
                        priority,
                    });
                }
            }
        }

        // Distinct priorities in 1..=3 already cap the adds at three.
        adds.sort_by_key(|a| a.priority);

        Ok(MoveRequest {
            id,
            team_id,
            submitted,
            drop,
            adds,
        })
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a request failed. Every variant is terminal for the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    DropNotOnRoster,
    DropRequired,
    NoAvailableAdds,
    InvalidRequest,
}

impl FailureReason {
    /// Stable code stored in `roster_move_requests.failure_reason`.
    pub fn as_str(self) -> &'static str {
        match self {
            FailureReason::DropNotOnRoster => "drop_not_on_roster",
            FailureReason::DropRequired => "drop_required",
            FailureReason::NoAvailableAdds => "no_available_adds",
            FailureReason::InvalidRequest => "invalid_request",
        }
    }

    /// Human-readable reason used in the weekly audit record.
    pub fn describe(self) -> &'static str {
        match self {
            FailureReason::DropNotOnRoster => "drop player not on team",
            FailureReason::DropRequired => "drop required",
            FailureReason::NoAvailableAdds => "no available adds",
            FailureReason::InvalidRequest => "invalid request",
        }
    }
}

impl FromStr for FailureReason {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop_not_on_roster" => Ok(FailureReason::DropNotOnRoster),
            "drop_required" => Ok(FailureReason::DropRequired),
            "no_available_adds" => Ok(FailureReason::NoAvailableAdds),
            "invalid_request" => Ok(FailureReason::InvalidRequest),
            other => Err(UnknownValue {
                kind: "failure reason",
                value: other.to_string(),
            }),
        }
    }
}

text_enum_sql!(FailureReason);

/// Terminal result of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum Outcome {
    Processed {
        added: AddChoice,
        dropped: Option<DropChoice>,
    },
    Failed {
        reason: FailureReason,
    },
}

impl Outcome {
    pub fn failed(reason: FailureReason) -> Self {
        Outcome::Failed { reason }
    }

    pub fn status(&self) -> RequestStatus {
        match self {
            Outcome::Processed { .. } => RequestStatus::Processed,
            Outcome::Failed { .. } => RequestStatus::Failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Stats and points
// ---------------------------------------------------------------------------

/// One player's daily contribution, credited to the team that rostered them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatLine {
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub date: NaiveDate,
    pub offense: i64,
    pub pitching: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Offense,
    Pitching,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Offense => "offense",
            Category::Pitching => "pitching",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offense" => Ok(Category::Offense),
            "pitching" => Ok(Category::Pitching),
            other => Err(UnknownValue {
                kind: "category",
                value: other.to_string(),
            }),
        }
    }
}

text_enum_sql!(Category);

/// Standings points won by a team in one category for one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointAward {
    pub team_id: TeamId,
    pub week_end: NaiveDate,
    pub category: Category,
    pub value: i64,
}
