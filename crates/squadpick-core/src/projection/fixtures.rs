// Fixture ease: how favorable each team's next few matches are.
//
// Each upcoming fixture contributes a factor between 1.2 (difficulty 1) and
// 0.8 (difficulty 5); a team's ease is the mean over its first `lookahead`
// upcoming fixtures.

use std::collections::HashMap;

use crate::snapshot::{Event, Fixture};

/// Ease of a team with no upcoming fixtures.
pub const NEUTRAL_EASE: f64 = 1.0;

/// Pick the gameweek the run is planning around.
///
/// Fallback order: first event flagged current, else first flagged next,
/// else first unfinished, else the last event listed.
pub fn current_gameweek(events: &[Event]) -> Option<u32> {
    events
        .iter()
        .find(|e| e.is_current)
        .or_else(|| events.iter().find(|e| e.is_next))
        .or_else(|| events.iter().find(|e| !e.finished))
        .or_else(|| events.last())
        .map(|e| e.id)
}

/// Convert a 1..=5 difficulty rating into a multiplier.
///
/// `1.2 - (d - 1) * (0.4 / 4)`, evaluated in tenths as `(13 - d) / 10` so
/// every rating lands on the nearest f64 of the exact value. Ratings outside
/// 1..=5 are not clamped.
pub fn difficulty_factor(difficulty: i64) -> f64 {
    (13 - difficulty) as f64 / 10.0
}

/// Per-team ease factors for one snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EaseTable {
    factors: HashMap<u32, f64>,
    gameweek: Option<u32>,
}

impl EaseTable {
    /// Build the table from the event list and the full fixture list.
    ///
    /// Fixtures count as upcoming when they have a scheduled gameweek at or
    /// after the current one; with no events at all every scheduled fixture
    /// counts. Fixture order is preserved when truncating to `lookahead`.
    pub fn build(events: &[Event], fixtures: &[Fixture], lookahead: usize) -> Self {
        let gameweek = current_gameweek(events);
        let floor = gameweek.unwrap_or(0);

        let mut per_team: HashMap<u32, Vec<f64>> = HashMap::new();
        for fixture in fixtures {
            let Some(event) = fixture.event else {
                continue;
            };
            if event < floor {
                continue;
            }
            for (team, difficulty) in [
                (fixture.team_h, fixture.team_h_difficulty),
                (fixture.team_a, fixture.team_a_difficulty),
            ] {
                per_team
                    .entry(team)
                    .or_default()
                    .push(difficulty_factor(difficulty));
            }
        }

        let factors = per_team
            .into_iter()
            .filter_map(|(team, mut list)| {
                list.truncate(lookahead);
                if list.is_empty() {
                    return None;
                }
                let mean = list.iter().sum::<f64>() / list.len() as f64;
                Some((team, mean))
            })
            .collect();

        EaseTable { factors, gameweek }
    }

    /// Ease factor for a team, neutral when it has no upcoming fixture.
    pub fn factor(&self, team: u32) -> f64 {
        self.factors.get(&team).copied().unwrap_or(NEUTRAL_EASE)
    }

    /// The gameweek the table was computed from.
    pub fn gameweek(&self) -> Option<u32> {
        self.gameweek
    }

    /// Number of teams with at least one upcoming fixture.
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn into_factors(self) -> HashMap<u32, f64> {
        self.factors
    }
}

/// Team id -> ease factor for every team with an upcoming fixture. Teams
/// missing from the map are neutral.
pub fn ease_factors(events: &[Event], fixtures: &[Fixture], lookahead: usize) -> HashMap<u32, f64> {
    EaseTable::build(events, fixtures, lookahead).into_factors()
}
