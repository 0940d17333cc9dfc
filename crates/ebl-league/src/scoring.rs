// Weekly category scoring: stat lines become standings points.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate};
use tracing::{debug, info};

use ebl_core::db::Database;
use ebl_core::model::{Category, PointAward, StatLine, TeamId};

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Sunday of the week containing `date`.
pub fn week_end(date: NaiveDate) -> NaiveDate {
    week_start(date) + Duration::days(6)
}

/// A team's summed production for one week.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryTotals {
    pub offense: i64,
    pub pitching: i64,
}

impl CategoryTotals {
    pub fn get(&self, category: Category) -> i64 {
        match category {
            Category::Offense => self.offense,
            Category::Pitching => self.pitching,
        }
    }
}

/// Sum stat lines per week (keyed by week start) and team.
pub fn weekly_totals(lines: &[StatLine]) -> BTreeMap<NaiveDate, BTreeMap<TeamId, CategoryTotals>> {
    let mut weeks: BTreeMap<NaiveDate, BTreeMap<TeamId, CategoryTotals>> = BTreeMap::new();
    for line in lines {
        let totals = weeks
            .entry(week_start(line.date))
            .or_default()
            .entry(line.team_id)
            .or_default();
        totals.offense += line.offense;
        totals.pitching += line.pitching;
    }
    weeks
}

/// Award placement points for one category.
///
/// Teams are ranked by total, highest first. Teams with equal totals share
/// the points of the first place their group occupies, and the next group
/// starts after all of them. Places past the end of `places` score nothing
/// and are omitted.
pub fn award_points_for_category(totals: &BTreeMap<TeamId, i64>, places: &[i64]) -> Vec<(TeamId, i64)> {
    let mut ranked: Vec<(TeamId, i64)> = totals.iter().map(|(&team, &total)| (team, total)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut awards = Vec::new();
    let mut place = 1;
    for group in ranked.chunk_by(|a, b| a.1 == b.1) {
        let Some(&value) = places.get(place - 1) else {
            break;
        };
        awards.extend(group.iter().map(|&(team, _)| (team, value)));
        place += group.len();
    }
    awards
}

/// Point awards for both categories of one week.
pub fn awards_for_week(
    week_end: NaiveDate,
    teams: &BTreeMap<TeamId, CategoryTotals>,
    places: &[i64],
) -> Vec<PointAward> {
    [Category::Offense, Category::Pitching]
        .into_iter()
        .flat_map(|category| {
            let totals: BTreeMap<TeamId, i64> = teams
                .iter()
                .map(|(&team, t)| (team, t.get(category)))
                .collect();
            award_points_for_category(&totals, places)
                .into_iter()
                .map(move |(team_id, value)| PointAward {
                    team_id,
                    week_end,
                    category,
                    value,
                })
        })
        .collect()
}

/// Score every week that has stats, or only the week ending on
/// `only_week_end`. Weeks that already have points are left alone.
///
/// Returns the number of point rows inserted.
pub fn score_weeks(db: &Database, places: &[i64], only_week_end: Option<NaiveDate>) -> Result<usize> {
    let weeks = weekly_totals(&db.stat_lines()?);
    let mut inserted = 0;

    for (start, teams) in &weeks {
        let end = week_end(*start);
        if only_week_end.is_some_and(|wanted| wanted != end) {
            continue;
        }
        if db.points_recorded_for(end)? {
            debug!("week ending {end} already scored, skipping");
            continue;
        }
        let awards = awards_for_week(end, teams, places);
        let count = db.insert_points(&awards)?;
        info!("scored week ending {end}: {count} point rows for {} teams", teams.len());
        inserted += count;
    }

    if inserted == 0 {
        info!("no new weeks to score");
    }
    Ok(inserted)
}
