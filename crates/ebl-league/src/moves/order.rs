// Processing order for a week's pending roster move requests.

use chrono::NaiveDateTime;
use serde::Serialize;

use ebl_core::model::{RequestId, TeamId};

/// A team with a pending request, carrying every key the order depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderEntry {
    pub team_id: TeamId,
    pub team_name: String,
    pub request_id: RequestId,
    pub has_empty_roster_spot: bool,
    /// Season-to-date standings points.
    pub points: i64,
    pub submitted: NaiveDateTime,
}

/// Put teams into the order their requests are resolved.
///
/// Teams with an empty roster spot go first regardless of points. Within
/// each group the lowest point total goes first, and equal totals go by
/// earliest submission. The sort is stable, so teams equal on every key
/// keep their input order.
pub fn order_teams(mut entries: Vec<OrderEntry>) -> Vec<OrderEntry> {
    entries.sort_by_key(|e| (!e.has_empty_roster_spot, e.points, e.submitted));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 4, 7)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn entry(id: i64, name: &str, empty: bool, points: i64, submitted: NaiveDateTime) -> OrderEntry {
        OrderEntry {
            team_id: TeamId(id),
            team_name: name.to_string(),
            request_id: RequestId(100 + id),
            has_empty_roster_spot: empty,
            points,
            submitted,
        }
    }

    fn names(ordered: &[OrderEntry]) -> Vec<&str> {
        ordered.iter().map(|e| e.team_name.as_str()).collect()
    }

    #[test]
    fn empty_spots_first_then_points_then_time() {
        let ordered = order_teams(vec![
            entry(1, "Alpha", true, 12, at(10, 0)),
            entry(2, "Beta", true, 6, at(9, 0)),
            entry(3, "Gamma", false, 6, at(8, 0)),
            entry(4, "Delta", false, 20, at(7, 0)),
        ]);
        assert_eq!(names(&ordered), vec!["Beta", "Alpha", "Gamma", "Delta"]);
    }

    #[test]
    fn needy_team_beats_any_point_total() {
        let ordered = order_teams(vec![
            entry(1, "Leader", false, 0, at(7, 0)),
            entry(2, "Needy", true, 500, at(12, 0)),
        ]);
        assert_eq!(names(&ordered), vec!["Needy", "Leader"]);
    }

    #[test]
    fn tied_points_go_by_submission_time() {
        let ordered = order_teams(vec![
            entry(1, "Late", false, 18, at(11, 30)),
            entry(2, "Early", false, 18, at(8, 15)),
            entry(3, "Middle", false, 18, at(9, 45)),
        ]);
        assert_eq!(names(&ordered), vec!["Early", "Middle", "Late"]);
    }

    #[test]
    fn identical_keys_keep_input_order() {
        let ordered = order_teams(vec![
            entry(3, "Third", false, 10, at(9, 0)),
            entry(1, "First", false, 10, at(9, 0)),
            entry(2, "Second", false, 10, at(9, 0)),
        ]);
        assert_eq!(names(&ordered), vec!["Third", "First", "Second"]);
    }

    #[test]
    fn empty_input_is_an_empty_order() {
        assert!(order_teams(Vec::new()).is_empty());
    }
}
