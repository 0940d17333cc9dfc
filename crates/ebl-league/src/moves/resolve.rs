// Resolution of a single team's request against the shared available pool.

use std::collections::BTreeSet;

use tracing::debug;

use ebl_core::model::{FailureReason, MoveRequest, Outcome, PlayerId};

/// Active, unrostered players for the duration of one pass.
///
/// The pass owns the pool and lends it to each resolution in turn, so every
/// team sees the commits of the teams ordered before it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailablePool {
    players: BTreeSet<PlayerId>,
}

impl AvailablePool {
    pub fn new(players: BTreeSet<PlayerId>) -> Self {
        Self { players }
    }

    pub fn contains(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Remove `player` from the pool. Returns false if they were not in it.
    fn take(&mut self, player: PlayerId) -> bool {
        self.players.remove(&player)
    }

    fn release(&mut self, player: PlayerId) {
        self.players.insert(player);
    }
}

impl FromIterator<PlayerId> for AvailablePool {
    fn from_iter<I: IntoIterator<Item = PlayerId>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// What resolving one request decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: Outcome,
    /// New value for the team's empty-roster-spot flag; `None` leaves it alone.
    pub empty_roster_spot: Option<bool>,
}

impl Resolution {
    fn failed(reason: FailureReason) -> Self {
        Self {
            outcome: Outcome::failed(reason),
            empty_roster_spot: None,
        }
    }
}

/// Resolve `request` for a team currently holding `roster`.
///
/// Only a successful commit touches `pool`: the selected add leaves it and
/// the dropped player (if any) returns to it. The caller applies the roster
/// swap and flag change from the returned [`Resolution`].
pub fn resolve_request(
    request: &MoveRequest,
    roster: &BTreeSet<PlayerId>,
    has_empty_roster_spot: bool,
    pool: &mut AvailablePool,
) -> Resolution {
    match &request.drop {
        Some(drop) if !roster.contains(&drop.player_id) => {
            return Resolution::failed(FailureReason::DropNotOnRoster);
        }
        None if !has_empty_roster_spot => {
            return Resolution::failed(FailureReason::DropRequired);
        }
        _ => {}
    }

    let selected = request.adds.iter().find(|choice| {
        let available = pool.contains(choice.player_id);
        debug!(
            "team {} add choice {} (priority {}) available: {}",
            request.team_id, choice.player_id, choice.priority, available
        );
        available
    });

    let Some(added) = selected.cloned() else {
        // The spot stays open either way: from the validated drop or the
        // pre-existing vacancy.
        return Resolution {
            outcome: Outcome::failed(FailureReason::NoAvailableAdds),
            empty_roster_spot: Some(true),
        };
    };

    pool.take(added.player_id);
    if let Some(drop) = &request.drop {
        pool.release(drop.player_id);
    }

    Resolution {
        outcome: Outcome::Processed {
            added,
            dropped: request.drop.clone(),
        },
        empty_roster_spot: Some(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ebl_core::model::{RequestId, RequestLine, TeamId};

    fn request(drop: Option<i64>, adds: &[i64]) -> MoveRequest {
        let mut lines: Vec<RequestLine> = drop
            .map(|id| RequestLine::drop(PlayerId(id), format!("Player {id}")))
            .into_iter()
            .collect();
        for (idx, &id) in adds.iter().enumerate() {
            lines.push(RequestLine::add(PlayerId(id), format!("Player {id}"), idx as u8 + 1));
        }
        let submitted = NaiveDate::from_ymd_opt(2025, 4, 7)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        MoveRequest::from_lines(RequestId(1), TeamId(1), submitted, lines).unwrap()
    }

    fn ids(values: &[i64]) -> BTreeSet<PlayerId> {
        values.iter().copied().map(PlayerId).collect()
    }

    fn pool(values: &[i64]) -> AvailablePool {
        values.iter().copied().map(PlayerId).collect()
    }

    fn added_id(resolution: &Resolution) -> Option<PlayerId> {
        match &resolution.outcome {
            Outcome::Processed { added, .. } => Some(added.player_id),
            Outcome::Failed { .. } => None,
        }
    }

    #[test]
    fn drop_not_on_roster_fails_without_mutation() {
        let mut available = pool(&[10, 11]);
        let resolution = resolve_request(&request(Some(99), &[10]), &ids(&[1, 2]), true, &mut available);

        assert_eq!(resolution.outcome, Outcome::failed(FailureReason::DropNotOnRoster));
        assert_eq!(resolution.empty_roster_spot, None);
        assert_eq!(available, pool(&[10, 11]));
    }

    #[test]
    fn missing_drop_without_open_spot_fails() {
        let mut available = pool(&[10]);
        let resolution = resolve_request(&request(None, &[10]), &ids(&[1, 2, 3, 4]), false, &mut available);

        assert_eq!(resolution.outcome, Outcome::failed(FailureReason::DropRequired));
        assert_eq!(resolution.empty_roster_spot, None);
        assert_eq!(available, pool(&[10]));
    }

    #[test]
    fn missing_drop_with_open_spot_adds_player() {
        let mut available = pool(&[10]);
        let resolution = resolve_request(&request(None, &[10]), &ids(&[1, 2, 3]), true, &mut available);

        assert_eq!(added_id(&resolution), Some(PlayerId(10)));
        assert_eq!(resolution.empty_roster_spot, Some(false));
        assert!(available.is_empty());
    }

    #[test]
    fn falls_back_to_next_priority() {
        let mut available = pool(&[20, 30]);
        let resolution = resolve_request(&request(Some(1), &[10, 20, 30]), &ids(&[1]), false, &mut available);

        assert_eq!(added_id(&resolution), Some(PlayerId(20)));
        assert_eq!(available, pool(&[1, 30]));
    }

    #[test]
    fn commit_swaps_players_in_pool() {
        let mut available = pool(&[10]);
        let resolution = resolve_request(&request(Some(1), &[10]), &ids(&[1, 2]), false, &mut available);

        match resolution.outcome {
            Outcome::Processed { added, dropped } => {
                assert_eq!(added.player_id, PlayerId(10));
                assert_eq!(added.priority, 1);
                assert_eq!(dropped.map(|d| d.player_id), Some(PlayerId(1)));
            }
            other => panic!("expected processed, got {other:?}"),
        }
        assert_eq!(available, pool(&[1]));
    }

    #[test]
    fn no_available_adds_opens_spot_and_leaves_pool() {
        let mut available = pool(&[50]);
        let resolution = resolve_request(&request(Some(1), &[10, 20, 30]), &ids(&[1]), false, &mut available);

        assert_eq!(resolution.outcome, Outcome::failed(FailureReason::NoAvailableAdds));
        assert_eq!(resolution.empty_roster_spot, Some(true));
        assert_eq!(available, pool(&[50]));
    }

    #[test]
    fn request_without_adds_finds_nothing() {
        let mut available = pool(&[10]);
        let resolution = resolve_request(&request(None, &[]), &ids(&[]), true, &mut available);
        assert_eq!(resolution.outcome, Outcome::failed(FailureReason::NoAvailableAdds));
    }

    #[test]
    fn later_team_sees_earlier_commit() {
        let mut available = pool(&[10]);
        let first = resolve_request(&request(None, &[10]), &ids(&[]), true, &mut available);
        let second = resolve_request(&request(Some(2), &[10]), &ids(&[2]), false, &mut available);

        assert_eq!(added_id(&first), Some(PlayerId(10)));
        assert_eq!(second.outcome, Outcome::failed(FailureReason::NoAvailableAdds));
        assert_eq!(second.empty_roster_spot, Some(true));
    }
}
