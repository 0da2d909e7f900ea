// Squad selection as a binary integer program.
//
// Three binaries per candidate: x (in squad), y (in XI), c (captain), with
// y <= x and c <= y. Maximizes XI score plus the captain's score again.
// Solved exactly by good_lp's pure-Rust microlp backend (LP relaxation with
// branch-and-bound) on a worker thread so the caller can bound the wait.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use good_lp::{
    constraint, microlp, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use tracing::{debug, info};

use crate::model::{Position, ScoredPlayer};
use crate::squad::feasibility::{diagnose, InfeasibleReason};
use crate::squad::plan::{build_plan, Assignment, SquadPlan};
use crate::squad::prune::prune_dominated;
use crate::squad::rules::{limits, SquadRules, BUDGET_TOLERANCE, SQUAD_SIZE, XI_SIZE};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error("no feasible squad: {0}")]
    Infeasible(InfeasibleReason),

    #[error("solver gave no answer within {limit:?}; feasibility unknown")]
    Timeout { limit: Duration },

    #[error("solver failed: {0}")]
    Solver(String),
}

// ---------------------------------------------------------------------------
// Solver input
// ---------------------------------------------------------------------------

/// The slice of a scored player the integer program needs.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    position: Position,
    team_id: u32,
    cost: f64,
    score: f64,
    is_locked: bool,
}

impl From<&ScoredPlayer> for Candidate {
    fn from(p: &ScoredPlayer) -> Self {
        Candidate {
            position: p.position(),
            team_id: p.team_id(),
            cost: p.cost(),
            score: p.score,
            is_locked: p.is_locked,
        }
    }
}

/// Per-candidate solver decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Decision {
    in_squad: bool,
    in_xi: bool,
    is_captain: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Choose the squad, XI and captain maximizing projected points.
///
/// Fails with `Infeasible` when no legal squad exists (naming the broken
/// constraint class when a pre-check catches it) and with `Timeout` when the
/// solver does not finish within `rules.time_limit`.
pub fn optimize(
    players: &[ScoredPlayer],
    rules: &SquadRules,
) -> Result<SquadPlan, OptimizeError> {
    diagnose(players, rules).map_err(OptimizeError::Infeasible)?;

    let kept = prune_dominated(players, rules.max_per_team);
    info!(
        "Optimizing over {} of {} candidates (budget {:.1}, max {} per team)",
        kept.len(),
        players.len(),
        rules.budget,
        rules.max_per_team
    );

    let candidates: Vec<Candidate> = kept.iter().map(|&i| Candidate::from(&players[i])).collect();
    let started = Instant::now();
    let decisions = solve_with_limit(candidates, rules)?;
    debug!("Solver finished in {:?}", started.elapsed());

    check_decisions(&decisions)?;

    let mut assignments: Vec<Assignment> = players
        .iter()
        .map(|p| Assignment {
            player_id: p.id(),
            in_squad: false,
            in_xi: false,
            is_captain: false,
        })
        .collect();
    for (&index, decision) in kept.iter().zip(decisions.iter()) {
        let slot = &mut assignments[index];
        slot.in_squad = decision.in_squad;
        slot.in_xi = decision.in_xi;
        slot.is_captain = decision.is_captain;
    }

    let plan = build_plan(players, assignments);
    info!(
        "Squad chosen: spent {:.1}, predicted {:.2} points",
        plan.spent, plan.predicted_points
    );
    Ok(plan)
}

/// Run `solve` on a worker thread and stop waiting after the time limit.
/// A timed-out worker is left to finish on its own; its answer is dropped.
fn solve_with_limit(
    candidates: Vec<Candidate>,
    rules: &SquadRules,
) -> Result<Vec<Decision>, OptimizeError> {
    let (tx, rx) = mpsc::channel();
    let budget = rules.budget;
    let max_per_team = rules.max_per_team;

    std::thread::Builder::new()
        .name("squad-solver".into())
        .spawn(move || {
            let _ = tx.send(solve(&candidates, budget, max_per_team));
        })
        .map_err(|e| OptimizeError::Solver(format!("failed to start solver thread: {e}")))?;

    match rx.recv_timeout(rules.time_limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(OptimizeError::Timeout {
            limit: rules.time_limit,
        }),
        Err(RecvTimeoutError::Disconnected) => Err(OptimizeError::Solver(
            "solver thread exited without an answer".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

fn solve(
    candidates: &[Candidate],
    budget: f64,
    max_per_team: usize,
) -> Result<Vec<Decision>, OptimizeError> {
    let mut vars = ProblemVariables::new();
    let x: Vec<Variable> = candidates.iter().map(|_| vars.add(variable().binary())).collect();
    let y: Vec<Variable> = candidates.iter().map(|_| vars.add(variable().binary())).collect();
    let c: Vec<Variable> = candidates.iter().map(|_| vars.add(variable().binary())).collect();

    let objective: Expression = candidates
        .iter()
        .enumerate()
        .map(|(i, cand)| cand.score * y[i] + cand.score * c[i])
        .sum();

    let mut model = vars.maximise(objective).using(microlp);

    for (i, cand) in candidates.iter().enumerate() {
        let (xi, yi, ci) = (x[i], y[i], c[i]);
        model = model.with(constraint!(yi <= xi)).with(constraint!(ci <= yi));
        if cand.is_locked {
            model = model.with(constraint!(xi == 1.0));
        }
    }

    let squad_size = SQUAD_SIZE as f64;
    let xi_size = XI_SIZE as f64;
    let squad_count: Expression = x.iter().copied().sum();
    let xi_count: Expression = y.iter().copied().sum();
    let captains: Expression = c.iter().copied().sum();
    model = model
        .with(constraint!(squad_count == squad_size))
        .with(constraint!(xi_count == xi_size))
        .with(constraint!(captains == 1.0));

    for position in Position::ALL {
        let l = limits(position);
        let quota = l.squad as f64;
        let xi_min = l.xi_min as f64;
        let xi_max = l.xi_max as f64;
        let in_squad = sum_where(&x, candidates, |cand| cand.position == position);
        let in_xi = sum_where(&y, candidates, |cand| cand.position == position);
        let in_xi_upper = in_xi.clone();
        model = model
            .with(constraint!(in_squad == quota))
            .with(constraint!(in_xi >= xi_min))
            .with(constraint!(in_xi_upper <= xi_max));
    }

    let spend: Expression = candidates
        .iter()
        .enumerate()
        .map(|(i, cand)| cand.cost * x[i])
        .sum();
    let ceiling = budget + BUDGET_TOLERANCE;
    model = model.with(constraint!(spend <= ceiling));

    let mut clubs: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (i, cand) in candidates.iter().enumerate() {
        clubs.entry(cand.team_id).or_default().push(i);
    }
    let cap = max_per_team as f64;
    for members in clubs.values() {
        if members.len() <= max_per_team {
            continue;
        }
        let from_club: Expression = members.iter().map(|&i| x[i]).sum();
        model = model.with(constraint!(from_club <= cap));
    }

    let solution = match model.solve() {
        Ok(solution) => solution,
        Err(ResolutionError::Infeasible) => {
            return Err(OptimizeError::Infeasible(InfeasibleReason::Undetermined));
        }
        Err(e) => return Err(OptimizeError::Solver(e.to_string())),
    };

    Ok((0..candidates.len())
        .map(|i| Decision {
            in_squad: solution.value(x[i]) > 0.5,
            in_xi: solution.value(y[i]) > 0.5,
            is_captain: solution.value(c[i]) > 0.5,
        })
        .collect())
}

fn sum_where(
    vars: &[Variable],
    candidates: &[Candidate],
    pred: impl Fn(&Candidate) -> bool,
) -> Expression {
    candidates
        .iter()
        .zip(vars.iter())
        .filter(|(cand, _)| pred(cand))
        .map(|(_, &v)| v)
        .sum()
}

/// Reject solver output that breaks the counting constraints.
fn check_decisions(decisions: &[Decision]) -> Result<(), OptimizeError> {
    let squad = decisions.iter().filter(|d| d.in_squad).count();
    let xi = decisions.iter().filter(|d| d.in_xi && d.in_squad).count();
    let captains = decisions
        .iter()
        .filter(|d| d.is_captain && d.in_xi && d.in_squad)
        .count();
    if squad != SQUAD_SIZE || xi != XI_SIZE || captains != 1 {
        return Err(OptimizeError::Solver(format!(
            "solver returned an inconsistent selection \
             ({squad} squad, {xi} XI, {captains} captains)"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Player;

    fn scored(id: u32, position: Position, team_id: u32, cost: f64, score: f64) -> ScoredPlayer {
        ScoredPlayer {
            player: Player {
                id,
                name: format!("P{id}"),
                team_id,
                team_code: format!("T{team_id}"),
                position,
                cost,
                status: "a".into(),
                chance_next: 1.0,
                form: 0.0,
                ppg: 0.0,
                ep_next: score,
            },
            fixture_factor: 1.0,
            score,
            is_locked: false,
        }
    }

    /// `clubs` clubs, each with 1 GKP, 2 DEF, 2 MID, 1 FWD. Scores and prices
    /// vary deterministically with the id.
    fn pool(clubs: u32) -> Vec<ScoredPlayer> {
        let layout = [
            Position::Goalkeeper,
            Position::Defender,
            Position::Defender,
            Position::Midfielder,
            Position::Midfielder,
            Position::Forward,
        ];
        let mut out = Vec::new();
        let mut id = 1;
        for team in 1..=clubs {
            for &position in &layout {
                let score = 2.0 + ((id * 7) % 11) as f64;
                let cost = 4.0 + ((id * 3) % 8) as f64 * 0.5;
                out.push(scored(id, position, team, cost, score));
                id += 1;
            }
        }
        out
    }

    fn rules(budget: f64, max_per_team: usize) -> SquadRules {
        SquadRules {
            budget,
            max_per_team,
            time_limit: Duration::from_secs(60),
        }
    }

    #[test]
    fn plan_respects_every_rule() {
        let players = pool(8);
        let rules = rules(85.0, 3);
        let plan = optimize(&players, &rules).expect("pool is feasible");

        assert_eq!(plan.squad.len(), SQUAD_SIZE);
        assert_eq!(plan.starting_xi.len(), XI_SIZE);
        assert_eq!(plan.bench.len(), SQUAD_SIZE - XI_SIZE);

        for position in Position::ALL {
            let l = limits(position);
            let in_squad = plan.squad.iter().filter(|r| r.position == position).count();
            let in_xi = plan.starting_xi.iter().filter(|r| r.position == position).count();
            assert_eq!(in_squad, l.squad, "{position} squad count");
            assert!(l.xi_min <= in_xi && in_xi <= l.xi_max, "{position} XI count {in_xi}");
        }

        assert!(plan.spent <= rules.budget + BUDGET_TOLERANCE);
        let mut per_club: BTreeMap<String, usize> = BTreeMap::new();
        for r in &plan.squad {
            *per_club.entry(r.team_code.clone()).or_default() += 1;
        }
        assert!(per_club.values().all(|&n| n <= 3));

        let captains: Vec<_> = plan.squad.iter().filter(|r| r.is_captain).collect();
        assert_eq!(captains.len(), 1);
        assert!(captains[0].in_xi);
        assert_eq!(captains[0].id, plan.captain);
    }

    #[test]
    fn captain_is_best_starter_and_counts_twice() {
        let players = pool(8);
        let plan = optimize(&players, &rules(85.0, 3)).unwrap();

        let best_xi = plan
            .starting_xi
            .iter()
            .map(|r| r.score)
            .fold(f64::MIN, f64::max);
        let captain = plan.captain_row().unwrap();
        assert!((captain.score - best_xi).abs() < 1e-9);

        let xi_total: f64 = plan.starting_xi.iter().map(|r| r.score).sum();
        assert!((plan.predicted_points - (xi_total + captain.score)).abs() < 1e-9);
    }

    #[test]
    fn repeated_runs_reach_the_same_objective() {
        let players = pool(8);
        let first = optimize(&players, &rules(85.0, 3)).unwrap();
        let second = optimize(&players, &rules(85.0, 3)).unwrap();
        assert!((first.predicted_points - second.predicted_points).abs() < 1e-6);
    }

    #[test]
    fn locked_player_is_always_selected() {
        let mut players = pool(8);
        // Lock the weakest forward.
        let weakest = players
            .iter()
            .filter(|p| p.position() == Position::Forward)
            .min_by(|a, b| a.score.total_cmp(&b.score))
            .map(|p| p.id())
            .unwrap();
        for p in players.iter_mut().filter(|p| p.id() == weakest) {
            p.is_locked = true;
        }

        let plan = optimize(&players, &rules(85.0, 3)).unwrap();
        assert!(plan.squad.iter().any(|r| r.id == weakest));
        let flags = plan.assignment(weakest).unwrap();
        assert!(flags.in_squad);
    }

    #[test]
    fn tighter_cap_still_respected() {
        let players = pool(10);
        let plan = optimize(&players, &rules(100.0, 2)).unwrap();
        let mut per_club: BTreeMap<String, usize> = BTreeMap::new();
        for r in &plan.squad {
            *per_club.entry(r.team_code.clone()).or_default() += 1;
        }
        assert!(per_club.values().all(|&n| n <= 2));
    }

    #[test]
    fn assignments_cover_every_candidate() {
        let players = pool(8);
        let plan = optimize(&players, &rules(85.0, 3)).unwrap();
        assert_eq!(plan.assignments.len(), players.len());
        assert_eq!(plan.assignments.iter().filter(|a| a.in_squad).count(), SQUAD_SIZE);
        assert_eq!(plan.assignments.iter().filter(|a| a.in_xi).count(), XI_SIZE);
        assert_eq!(plan.assignments.iter().filter(|a| a.is_captain).count(), 1);
    }

    /// `clubs` clubs, each with 2 GKP, 3 DEF, 3 MID, 2 FWD, so plenty of
    /// players are dominated across clubs.
    fn deep_pool(clubs: u32) -> Vec<ScoredPlayer> {
        let layout = [
            Position::Goalkeeper,
            Position::Goalkeeper,
            Position::Defender,
            Position::Defender,
            Position::Defender,
            Position::Midfielder,
            Position::Midfielder,
            Position::Midfielder,
            Position::Forward,
            Position::Forward,
        ];
        let mut out = Vec::new();
        let mut id = 1;
        for team in 1..=clubs {
            for &position in &layout {
                let score = 1.0 + ((id * 5) % 13) as f64 * 0.5;
                let cost = 4.0 + ((id * 7) % 9) as f64 * 0.5;
                out.push(scored(id, position, team, cost, score));
                id += 1;
            }
        }
        out
    }

    fn objective(candidates: &[Candidate], decisions: &[Decision]) -> f64 {
        candidates
            .iter()
            .zip(decisions)
            .map(|(cand, d)| {
                let starts = if d.in_xi { cand.score } else { 0.0 };
                let captains = if d.is_captain { cand.score } else { 0.0 };
                starts + captains
            })
            .sum()
    }

    #[test]
    fn pruning_keeps_the_optimum() {
        // Lock a keeper that pruning would otherwise drop.
        let mut locked_pool = deep_pool(10);
        let kept = prune_dominated(&locked_pool, 3);
        let dropped_keeper = (0..locked_pool.len())
            .find(|i| !kept.contains(i) && locked_pool[*i].position() == Position::Goalkeeper)
            .expect("some keeper is dominated");
        locked_pool[dropped_keeper].is_locked = true;

        let cases = [
            (deep_pool(10), 100.0, 3),
            (deep_pool(10), 75.0, 3),
            (deep_pool(10), 100.0, 2),
            (deep_pool(10), 75.0, 2),
            (locked_pool, 75.0, 3),
        ];
        for (players, budget, cap) in cases {
            assert!(prune_dominated(&players, cap).len() < players.len());

            let all: Vec<Candidate> = players.iter().map(Candidate::from).collect();
            let full = solve(&all, budget, cap).expect("full model is feasible");
            let full_objective = objective(&all, &full);

            let plan = optimize(&players, &rules(budget, cap)).expect("pruned model is feasible");
            assert!(
                (plan.predicted_points - full_objective).abs() < 1e-6,
                "budget {budget}, cap {cap}: pruned {} vs full {full_objective}",
                plan.predicted_points
            );
        }
    }

    #[test]
    fn precheck_failure_is_reported_as_infeasible() {
        let players = pool(2);
        match optimize(&players, &rules(100.0, 3)) {
            Err(OptimizeError::Infeasible(reason)) => {
                assert_ne!(reason, InfeasibleReason::Undetermined)
            }
            other => panic!("expected Infeasible, got: {other:?}"),
        }
    }

    #[test]
    fn budget_and_cap_interaction_is_found_by_the_solver() {
        // Clubs 1 and 2 are cheap, everyone else is pricey. Ignoring the cap
        // the cheapest squad costs 75.0, but under cap 3 only six cheap
        // players fit: 6 * 4.0 + 9 * 9.0 = 105.0.
        let mut players = pool(8);
        for p in players.iter_mut() {
            p.player.cost = if p.team_id() <= 2 { 4.0 } else { 9.0 };
        }
        match optimize(&players, &rules(100.0, 3)) {
            Err(OptimizeError::Infeasible(InfeasibleReason::Undetermined)) => {}
            other => panic!("expected solver-proven infeasibility, got: {other:?}"),
        }
    }
}
