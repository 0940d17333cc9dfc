// The pass against a plain in-memory `MoveStore`, covering paths the SQLite
// store never produces on its own: malformed stored requests and store
// failures part-way through a pass.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use anyhow::{bail, Result};
use chrono::{NaiveDate, NaiveDateTime};

use ebl_core::model::{
    FailureReason, Outcome, PlayerId, RequestId, RequestLine, Team, TeamId,
};
use ebl_core::store::{MoveStore, PendingRequest};
use ebl_league::moves::process_pending_moves;

// ===========================================================================
// Test store
// ===========================================================================

#[derive(Default)]
struct MemoryStore {
    teams: BTreeMap<TeamId, Team>,
    rosters: HashMap<TeamId, BTreeSet<PlayerId>>,
    free_agents: BTreeSet<PlayerId>,
    points: HashMap<TeamId, i64>,
    pending: Vec<PendingRequest>,
    outcomes: BTreeMap<RequestId, Outcome>,
    /// Fail the Nth `record_outcome` call (1-based).
    fail_on_record: Option<usize>,
    records: usize,
}

impl MemoryStore {
    fn add_team(&mut self, id: i64, empty: bool, points: i64, roster: &[i64]) {
        let team = TeamId(id);
        self.teams.insert(
            team,
            Team {
                id: team,
                name: format!("Team {id}"),
                has_empty_roster_spot: empty,
            },
        );
        self.rosters.insert(team, roster.iter().copied().map(PlayerId).collect());
        self.points.insert(team, points);
    }

    fn submit(&mut self, request: i64, team: i64, submitted: NaiveDateTime, lines: Vec<RequestLine>) {
        let team = self.teams[&TeamId(team)].clone();
        self.pending.push(PendingRequest {
            request_id: RequestId(request),
            team,
            submitted,
            lines,
        });
    }
}

impl MoveStore for MemoryStore {
    fn season_points(&self) -> Result<HashMap<TeamId, i64>> {
        Ok(self.points.clone())
    }

    fn pending_requests(&self) -> Result<Vec<PendingRequest>> {
        Ok(self.pending.clone())
    }

    fn available_players(&self) -> Result<BTreeSet<PlayerId>> {
        Ok(self.free_agents.clone())
    }

    fn team_roster(&self, team: TeamId) -> Result<BTreeSet<PlayerId>> {
        Ok(self.rosters.get(&team).cloned().unwrap_or_default())
    }

    fn record_outcome(&mut self, request: RequestId, outcome: &Outcome) -> Result<()> {
        self.records += 1;
        if self.fail_on_record == Some(self.records) {
            bail!("disk full");
        }
        self.outcomes.insert(request, outcome.clone());
        Ok(())
    }

    fn apply_move(&mut self, team: TeamId, drop: Option<PlayerId>, add: PlayerId) -> Result<()> {
        let roster = self.rosters.entry(team).or_default();
        if let Some(drop) = drop {
            if !roster.remove(&drop) {
                bail!("player {drop} is not on team {team}");
            }
            self.free_agents.insert(drop);
        }
        self.free_agents.remove(&add);
        roster.insert(add);
        Ok(())
    }

    fn set_empty_roster_spot(&mut self, team: TeamId, empty: bool) -> Result<()> {
        match self.teams.get_mut(&team) {
            Some(t) => t.has_empty_roster_spot = empty,
            None => bail!("unknown team {team}"),
        }
        Ok(())
    }
}

fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 4, 7)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn drop_line(id: i64) -> RequestLine {
    RequestLine::drop(PlayerId(id), format!("Player {id}"))
}

fn add_line(id: i64, priority: u8) -> RequestLine {
    RequestLine::add(PlayerId(id), format!("Player {id}"), priority)
}

// ===========================================================================
// Tests
// ===========================================================================

#[test]
fn malformed_request_fails_and_pass_continues() {
    let mut store = MemoryStore::default();
    store.free_agents = [PlayerId(50), PlayerId(51)].into();
    store.add_team(1, false, 3, &[1, 2]);
    store.add_team(2, false, 9, &[3, 4]);
    // Two adds share priority 1.
    store.submit(10, 1, at(8), vec![drop_line(1), add_line(50, 1), add_line(51, 1)]);
    store.submit(11, 2, at(9), vec![drop_line(3), add_line(50, 1)]);

    let report = process_pending_moves(&mut store).unwrap();

    assert_eq!(report.resolved_count(), 2);
    assert_eq!(
        store.outcomes[&RequestId(10)],
        Outcome::failed(FailureReason::InvalidRequest)
    );
    assert!(matches!(store.outcomes[&RequestId(11)], Outcome::Processed { .. }));
    assert_eq!(store.rosters[&TeamId(1)], [PlayerId(1), PlayerId(2)].into());
    assert!(store.rosters[&TeamId(2)].contains(&PlayerId(50)));
    assert!(!store.teams[&TeamId(1)].has_empty_roster_spot);
}

#[test]
fn store_error_stops_the_pass() {
    let mut store = MemoryStore::default();
    store.free_agents = [PlayerId(50), PlayerId(51)].into();
    store.add_team(1, false, 1, &[1]);
    store.add_team(2, false, 2, &[2]);
    store.add_team(3, false, 3, &[3]);
    store.submit(10, 1, at(8), vec![drop_line(1), add_line(50, 1)]);
    store.submit(11, 2, at(8), vec![drop_line(2), add_line(51, 1)]);
    store.submit(12, 3, at(8), vec![drop_line(3), add_line(52, 1)]);
    store.fail_on_record = Some(2);

    let err = process_pending_moves(&mut store).unwrap_err();
    assert!(err.to_string().contains("disk full"));

    // Nothing past the failing team was attempted.
    assert_eq!(store.outcomes.len(), 1);
    assert!(store.outcomes.contains_key(&RequestId(10)));
    assert_eq!(store.rosters[&TeamId(3)], [PlayerId(3)].into());
}

#[test]
fn priorities_skip_unavailable_choice() {
    let mut store = MemoryStore::default();
    store.free_agents = [PlayerId(21), PlayerId(22)].into();
    store.add_team(1, false, 0, &[1, 2, 3, 4]);
    store.submit(
        10,
        1,
        at(8),
        vec![drop_line(4), add_line(20, 1), add_line(21, 2), add_line(22, 3)],
    );

    let report = process_pending_moves(&mut store).unwrap();
    match &report.entries[0].outcome {
        Outcome::Processed { added, dropped } => {
            assert_eq!(added.player_id, PlayerId(21));
            assert_eq!(added.priority, 2);
            assert_eq!(dropped.as_ref().map(|d| d.player_id), Some(PlayerId(4)));
        }
        other => panic!("expected processed, got {other:?}"),
    }
    assert_eq!(store.free_agents, [PlayerId(4), PlayerId(22)].into());
}

#[test]
fn failures_leave_rosters_and_pool_alone() {
    let mut store = MemoryStore::default();
    store.free_agents = [PlayerId(30)].into();
    store.add_team(1, false, 0, &[1, 2]);
    store.add_team(2, false, 5, &[3, 4]);
    store.add_team(3, true, 8, &[5]);
    // Drop not on roster, drop required, no available adds.
    store.submit(10, 1, at(8), vec![drop_line(3), add_line(30, 1)]);
    store.submit(11, 2, at(8), vec![add_line(30, 1)]);
    store.submit(12, 3, at(8), vec![add_line(99, 1)]);

    let report = process_pending_moves(&mut store).unwrap();

    assert_eq!(report.failed_count(), 3);
    let reasons: Vec<Outcome> = [10, 11, 12]
        .iter()
        .map(|&id| store.outcomes[&RequestId(id)].clone())
        .collect();
    assert_eq!(
        reasons,
        vec![
            Outcome::failed(FailureReason::DropNotOnRoster),
            Outcome::failed(FailureReason::DropRequired),
            Outcome::failed(FailureReason::NoAvailableAdds),
        ]
    );
    assert_eq!(store.free_agents, [PlayerId(30)].into());
    assert_eq!(store.rosters[&TeamId(1)], [PlayerId(1), PlayerId(2)].into());
    assert_eq!(store.rosters[&TeamId(2)], [PlayerId(3), PlayerId(4)].into());
    assert_eq!(store.rosters[&TeamId(3)], [PlayerId(5)].into());
    assert!(store.teams[&TeamId(3)].has_empty_roster_spot);
}
