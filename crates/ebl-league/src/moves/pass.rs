// One weekly resolution pass over every pending roster move request.

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{info, warn};

use ebl_core::model::{DropChoice, FailureReason, MoveRequest, Outcome, RequestId, TeamId};
use ebl_core::store::{MoveStore, PendingRequest};

use super::order::{order_teams, OrderEntry};
use super::resolve::{resolve_request, AvailablePool, Resolution};

/// What happened to one team's request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub team_id: TeamId,
    pub team_name: String,
    pub request_id: RequestId,
    pub submitted: NaiveDateTime,
    /// The team's flag when its turn came, before this resolution.
    pub had_empty_roster_spot: bool,
    pub drop: Option<DropChoice>,
    pub outcome: Outcome,
}

/// Everything a pass decided, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MoveReport {
    pub order: Vec<OrderEntry>,
    pub entries: Vec<ReportEntry>,
}

impl MoveReport {
    /// Requests given a terminal status by this pass.
    pub fn resolved_count(&self) -> usize {
        self.entries.len()
    }

    pub fn processed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Processed { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.resolved_count() - self.processed_count()
    }
}

/// Resolve every pending request in processing order.
///
/// Each team's outcome, roster swap and flag change are written through
/// `store` before the next team is resolved. Per-request failures are
/// recorded and never stop the pass; an `Err` from the store does, and the
/// caller is expected to discard the unit of work.
pub fn process_pending_moves<S: MoveStore>(store: &mut S) -> Result<MoveReport> {
    let points = store.season_points()?;
    let pending = store.pending_requests()?;
    if pending.is_empty() {
        info!("no pending roster move requests");
        return Ok(MoveReport::default());
    }

    let candidates: Vec<OrderEntry> = pending
        .iter()
        .map(|p| OrderEntry {
            team_id: p.team.id,
            team_name: p.team.name.clone(),
            request_id: p.request_id,
            has_empty_roster_spot: p.team.has_empty_roster_spot,
            points: points.get(&p.team.id).copied().unwrap_or(0),
            submitted: p.submitted,
        })
        .collect();
    let order = order_teams(candidates);

    for (idx, entry) in order.iter().enumerate() {
        info!(
            "order {}: {} (points: {}, empty: {})",
            idx + 1,
            entry.team_name,
            entry.points,
            u8::from(entry.has_empty_roster_spot)
        );
    }

    let mut pool = AvailablePool::new(store.available_players()?);
    info!("{} players available before resolution", pool.len());

    let mut by_request: HashMap<RequestId, PendingRequest> =
        pending.into_iter().map(|p| (p.request_id, p)).collect();

    let mut entries = Vec::with_capacity(order.len());
    for slot in &order {
        let Some(pending) = by_request.remove(&slot.request_id) else {
            continue;
        };
        let entry = resolve_one(store, pending, &mut pool)?;
        entries.push(entry);
    }

    let report = MoveReport { order, entries };
    info!(
        "resolved {} roster move requests ({} processed, {} failed)",
        report.resolved_count(),
        report.processed_count(),
        report.failed_count()
    );
    Ok(report)
}

fn resolve_one<S: MoveStore>(
    store: &mut S,
    pending: PendingRequest,
    pool: &mut AvailablePool,
) -> Result<ReportEntry> {
    let PendingRequest {
        request_id,
        team,
        submitted,
        lines,
    } = pending;

    let (drop, resolution) = match MoveRequest::from_lines(request_id, team.id, submitted, lines) {
        Ok(request) => {
            let roster = store.team_roster(team.id)?;
            let resolution = resolve_request(&request, &roster, team.has_empty_roster_spot, pool);
            (request.drop, resolution)
        }
        Err(e) => {
            warn!("request {request_id} from {} is malformed: {e}", team.name);
            let resolution = Resolution {
                outcome: Outcome::failed(FailureReason::InvalidRequest),
                empty_roster_spot: None,
            };
            (None, resolution)
        }
    };

    store.record_outcome(request_id, &resolution.outcome)?;
    if let Outcome::Processed { added, dropped } = &resolution.outcome {
        store.apply_move(team.id, dropped.as_ref().map(|d| d.player_id), added.player_id)?;
    }
    if let Some(empty) = resolution.empty_roster_spot {
        store.set_empty_roster_spot(team.id, empty)?;
    }

    match &resolution.outcome {
        Outcome::Processed { added, dropped } => info!(
            "{}: processed, added {} (priority {}), dropped {}",
            team.name,
            added.player_name,
            added.priority,
            dropped.as_ref().map_or("nobody", |d| d.player_name.as_str())
        ),
        Outcome::Failed { reason } => info!("{}: failed ({})", team.name, reason.describe()),
    }

    Ok(ReportEntry {
        team_id: team.id,
        team_name: team.name,
        request_id,
        submitted,
        had_empty_roster_spot: team.has_empty_roster_spot,
        drop,
        outcome: resolution.outcome,
    })
}
