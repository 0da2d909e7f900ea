// Solver output -> squad, starting XI, captaincy and bench order.

use std::cmp::Ordering;

use serde::Serialize;

use crate::model::{Position, ScoredPlayer};

/// Selection flags for one candidate player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub player_id: u32,
    pub in_squad: bool,
    pub in_xi: bool,
    pub is_captain: bool,
}

/// One squad member as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRow {
    pub id: u32,
    pub name: String,
    pub team_code: String,
    pub position: Position,
    pub cost: f64,
    pub score: f64,
    pub is_locked: bool,
    pub in_xi: bool,
    pub is_captain: bool,
    pub is_vice_captain: bool,
}

/// A complete, legal squad.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SquadPlan {
    /// All 15 members, by position then descending score.
    pub squad: Vec<PlanRow>,
    pub starting_xi: Vec<PlanRow>,
    /// Outfield substitutes weakest first, then the reserve keeper.
    pub bench: Vec<PlanRow>,
    pub captain: u32,
    pub vice_captain: Option<u32>,
    pub spent: f64,
    /// XI scores plus the captain's score counted a second time.
    pub predicted_points: f64,
    pub assignments: Vec<Assignment>,
}

impl SquadPlan {
    /// Flags for any candidate that was offered to the optimizer.
    pub fn assignment(&self, player_id: u32) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.player_id == player_id)
    }

    pub fn captain_row(&self) -> Option<&PlanRow> {
        self.squad.iter().find(|r| r.id == self.captain)
    }
}

/// Assemble the plan from the candidate list and the flags the solver chose.
/// `assignments` must hold one entry per candidate, in candidate order.
pub fn build_plan(candidates: &[ScoredPlayer], assignments: Vec<Assignment>) -> SquadPlan {
    let selected: Vec<(&ScoredPlayer, &Assignment)> = candidates
        .iter()
        .zip(assignments.iter())
        .filter(|(_, a)| a.in_squad)
        .collect();

    let captain = selected
        .iter()
        .find(|(_, a)| a.is_captain)
        .map(|(p, _)| p.id())
        .unwrap_or_default();

    let vice_captain = selected
        .iter()
        .filter(|(p, a)| a.in_xi && p.id() != captain)
        .max_by(|(a, _), (b, _)| by_score(a, b).then_with(|| b.id().cmp(&a.id())))
        .map(|(p, _)| p.id());

    let mut squad: Vec<PlanRow> = selected
        .iter()
        .map(|(p, a)| PlanRow {
            id: p.id(),
            name: p.player.name.clone(),
            team_code: p.player.team_code.clone(),
            position: p.position(),
            cost: p.cost(),
            score: p.score,
            is_locked: p.is_locked,
            in_xi: a.in_xi,
            is_captain: a.is_captain,
            is_vice_captain: Some(p.id()) == vice_captain,
        })
        .collect();
    squad.sort_by(|a, b| {
        a.position
            .sort_order()
            .cmp(&b.position.sort_order())
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
            .then_with(|| a.id.cmp(&b.id))
    });

    let starting_xi: Vec<PlanRow> = squad.iter().filter(|r| r.in_xi).cloned().collect();
    let bench = bench_order(squad.iter().filter(|r| !r.in_xi).cloned().collect());

    let spent = squad.iter().map(|r| r.cost).sum();
    let captain_score = squad
        .iter()
        .find(|r| r.is_captain)
        .map(|r| r.score)
        .unwrap_or(0.0);
    let predicted_points = starting_xi.iter().map(|r| r.score).sum::<f64>() + captain_score;

    SquadPlan {
        squad,
        starting_xi,
        bench,
        captain,
        vice_captain,
        spent,
        predicted_points,
        assignments,
    }
}

/// Outfield substitutes by ascending score (the first to come on is the
/// weakest), reserve goalkeeper appended last.
pub fn bench_order(mut bench: Vec<PlanRow>) -> Vec<PlanRow> {
    bench.sort_by(|a, b| {
        let a_gk = a.position == Position::Goalkeeper;
        let b_gk = b.position == Position::Goalkeeper;
        a_gk.cmp(&b_gk)
            .then_with(|| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal))
            .then_with(|| a.id.cmp(&b.id))
    });
    bench
}

fn by_score(a: &ScoredPlayer, b: &ScoredPlayer) -> Ordering {
    a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal)
}
