// Pre-solve feasibility checks.
//
// Each check is a necessary condition for a legal squad. When one fails the
// run is rejected before the solver starts, with the constraint class that
// broke and a hint at what to relax.

use std::collections::BTreeMap;
use std::fmt;

use crate::model::{Position, ScoredPlayer};
use crate::squad::rules::{limits, SquadRules, SQUAD_SIZE};

/// Why no legal squad exists.
#[derive(Debug, Clone, PartialEq)]
pub enum InfeasibleReason {
    /// Too few eligible players at a position after filtering.
    PositionSupply {
        position: Position,
        available: usize,
        required: usize,
    },
    /// More locked players at a position than the squad takes.
    LockedQuota {
        position: Position,
        locked: usize,
        allowed: usize,
    },
    /// More locked players from one club than the per-team cap.
    LockedTeamCap {
        team_code: String,
        locked: usize,
        cap: usize,
    },
    /// Locked players alone cost more than the budget.
    LockedBudget { locked_cost: f64, budget: f64 },
    /// Even the cheapest legal fill exceeds the budget.
    Budget { cheapest: f64, budget: f64 },
    /// Not enough clubs to fill a position (or the squad) under the cap.
    TeamCap {
        position: Option<Position>,
        reachable: usize,
        required: usize,
        cap: usize,
    },
    /// The solver proved infeasibility that none of the checks explains,
    /// typically an interaction of budget, locks and the team cap.
    Undetermined,
}

impl fmt::Display for InfeasibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InfeasibleReason::PositionSupply {
                position,
                available,
                required,
            } => write!(
                f,
                "only {available} eligible {position} players, need {required}; loosen the filters"
            ),
            InfeasibleReason::LockedQuota {
                position,
                locked,
                allowed,
            } => write!(
                f,
                "{locked} locked {position} players but the squad takes {allowed}; unlock some"
            ),
            InfeasibleReason::LockedTeamCap {
                team_code,
                locked,
                cap,
            } => write!(
                f,
                "{locked} locked players from {team_code} exceed max_per_team {cap}; unlock some or raise the cap"
            ),
            InfeasibleReason::LockedBudget {
                locked_cost,
                budget,
            } => write!(
                f,
                "locked players cost {locked_cost:.1} against a budget of {budget:.1}; unlock some or raise the budget"
            ),
            InfeasibleReason::Budget { cheapest, budget } => write!(
                f,
                "cheapest possible squad costs {cheapest:.1} against a budget of {budget:.1}; raise the budget"
            ),
            InfeasibleReason::TeamCap {
                position: Some(position),
                reachable,
                required,
                cap,
            } => write!(
                f,
                "max_per_team {cap} allows only {reachable} of {required} {position} players from the eligible clubs; raise the cap"
            ),
            InfeasibleReason::TeamCap {
                position: None,
                reachable,
                required,
                cap,
            } => write!(
                f,
                "max_per_team {cap} allows only {reachable} of {required} squad players from the eligible clubs; raise the cap"
            ),
            InfeasibleReason::Undetermined => write!(
                f,
                "constraints conflict; try relaxing the budget, the lock list or the team cap"
            ),
        }
    }
}

/// Run every necessary-condition check, returning the first violation.
pub fn diagnose(players: &[ScoredPlayer], rules: &SquadRules) -> Result<(), InfeasibleReason> {
    let cap = rules.max_per_team;

    for position in Position::ALL {
        let required = limits(position).squad;
        let at_position: Vec<&ScoredPlayer> =
            players.iter().filter(|p| p.position() == position).collect();

        if at_position.len() < required {
            return Err(InfeasibleReason::PositionSupply {
                position,
                available: at_position.len(),
                required,
            });
        }

        let locked = at_position.iter().filter(|p| p.is_locked).count();
        if locked > required {
            return Err(InfeasibleReason::LockedQuota {
                position,
                locked,
                allowed: required,
            });
        }

        let reachable = capped_club_total(at_position.iter().copied(), cap);
        if reachable < required {
            return Err(InfeasibleReason::TeamCap {
                position: Some(position),
                reachable,
                required,
                cap,
            });
        }
    }

    let reachable = capped_club_total(players.iter(), cap);
    if reachable < SQUAD_SIZE {
        return Err(InfeasibleReason::TeamCap {
            position: None,
            reachable,
            required: SQUAD_SIZE,
            cap,
        });
    }

    let mut locked_by_team: BTreeMap<u32, (usize, &str)> = BTreeMap::new();
    for p in players.iter().filter(|p| p.is_locked) {
        let entry = locked_by_team
            .entry(p.team_id())
            .or_insert((0, p.player.team_code.as_str()));
        entry.0 += 1;
    }
    if let Some((_, &(locked, team_code))) = locked_by_team.iter().find(|(_, (n, _))| *n > cap) {
        return Err(InfeasibleReason::LockedTeamCap {
            team_code: team_code.to_string(),
            locked,
            cap,
        });
    }

    let locked_cost: f64 = players.iter().filter(|p| p.is_locked).map(|p| p.cost()).sum();
    if !rules.within_budget(locked_cost) {
        return Err(InfeasibleReason::LockedBudget {
            locked_cost,
            budget: rules.budget,
        });
    }

    let cheapest = cheapest_fill(players);
    if !rules.within_budget(cheapest) {
        return Err(InfeasibleReason::Budget {
            cheapest,
            budget: rules.budget,
        });
    }

    Ok(())
}

/// Sum over clubs of min(cap, players from that club).
fn capped_club_total<'a>(players: impl Iterator<Item = &'a ScoredPlayer>, cap: usize) -> usize {
    let mut per_club: BTreeMap<u32, usize> = BTreeMap::new();
    for p in players {
        *per_club.entry(p.team_id()).or_default() += 1;
    }
    per_club.values().map(|&n| n.min(cap)).sum()
}

/// Cost of the locked players plus the cheapest unlocked players filling
/// each position's remaining quota. Ignores the team cap, so it is a lower
/// bound on any legal squad's cost.
fn cheapest_fill(players: &[ScoredPlayer]) -> f64 {
    Position::ALL
        .iter()
        .map(|&position| {
            let at_position = players.iter().filter(|p| p.position() == position);
            let locked: Vec<f64> = at_position
                .clone()
                .filter(|p| p.is_locked)
                .map(|p| p.cost())
                .collect();
            let mut free: Vec<f64> = at_position
                .filter(|p| !p.is_locked)
                .map(|p| p.cost())
                .collect();
            free.sort_by(|a, b| a.total_cmp(b));
            let open = limits(position).squad.saturating_sub(locked.len());
            locked.iter().sum::<f64>() + free.iter().take(open).sum::<f64>()
        })
        .sum()
}
