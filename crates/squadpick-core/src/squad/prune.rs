// Candidate reduction ahead of the integer program.
//
// Player `a` dominates `b` when both play the same position, `a` scores at
// least as much and costs no more (ties broken by id). Given an optimal
// squad holding an unlocked `b`, swapping in an outside dominator from a
// club with room keeps every constraint and never lowers the objective.
// Once a player's dominators span more clubs than a squad can possibly
// block, such a swap always exists, so the player is never needed.
//
// A club blocks every dominator it has when they are all already in the
// squad (at most `quota - 1` of them besides `b`) or when the club is full
// (at most `(SQUAD_SIZE - 1) / cap` clubs among the other fourteen).

use std::collections::HashSet;

use crate::model::ScoredPlayer;
use crate::squad::rules::{limits, SQUAD_SIZE};

/// Strict dominance with an id tie-break, so no two players dominate each other.
pub fn dominates(a: &ScoredPlayer, b: &ScoredPlayer) -> bool {
    a.position() == b.position()
        && a.score >= b.score
        && a.cost() <= b.cost()
        && (a.score > b.score || a.cost() < b.cost() || a.id() < b.id())
}

/// Number of distinct clubs that must hold a dominator before a player can
/// be dropped.
pub fn clubs_needed(quota: usize, max_per_team: usize) -> usize {
    let full_clubs = (SQUAD_SIZE - 1) / max_per_team.max(1);
    quota - 1 + full_clubs + 1
}

/// Indices of the players worth handing to the solver. Locked players are
/// always kept.
pub fn prune_dominated(players: &[ScoredPlayer], max_per_team: usize) -> Vec<usize> {
    (0..players.len())
        .filter(|&i| {
            let p = &players[i];
            if p.is_locked {
                return true;
            }
            let needed = clubs_needed(limits(p.position()).squad, max_per_team);
            let mut clubs: HashSet<u32> = HashSet::new();
            for q in players.iter() {
                if dominates(q, p) {
                    clubs.insert(q.team_id());
                    if clubs.len() >= needed {
                        return false;
                    }
                }
            }
            true
        })
        .collect()
}
