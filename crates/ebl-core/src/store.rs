// Data-access contract for the weekly roster move pass.

use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use chrono::NaiveDateTime;

use crate::model::{Outcome, PlayerId, RequestId, RequestLine, Team, TeamId};

/// A team's current pending request, as loaded for resolution.
///
/// Line items are carried raw so a malformed request can be recorded as
/// failed instead of aborting the load.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request_id: RequestId,
    pub team: Team,
    pub submitted: NaiveDateTime,
    pub lines: Vec<RequestLine>,
}

/// Everything the resolution pass reads and writes.
///
/// Implementations run inside one all-or-nothing unit of work: any `Err`
/// aborts the pass and nothing it wrote may persist.
pub trait MoveStore {
    /// Season-to-date standings points per team. Teams without awards may be
    /// absent.
    fn season_points(&self) -> Result<HashMap<TeamId, i64>>;

    /// The newest pending request of each team that has one.
    fn pending_requests(&self) -> Result<Vec<PendingRequest>>;

    /// Active players not on any team.
    fn available_players(&self) -> Result<BTreeSet<PlayerId>>;

    fn team_roster(&self, team: TeamId) -> Result<BTreeSet<PlayerId>>;

    /// Mark the request `processed` or `failed` and record what happened.
    fn record_outcome(&mut self, request: RequestId, outcome: &Outcome) -> Result<()>;

    /// Swap `drop` (if any) off the team's roster and put `add` on it.
    fn apply_move(&mut self, team: TeamId, drop: Option<PlayerId>, add: PlayerId) -> Result<()>;

    fn set_empty_roster_spot(&mut self, team: TeamId, empty: bool) -> Result<()>;
}
