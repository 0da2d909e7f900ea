// Snapshot + config -> scored pool -> optimal squad.
//
// Steps:
// 1. Normalize raw elements into players
// 2. Build the fixture ease table for the lookahead window
// 3. Score every player (bias, lock flags)
// 4. Apply availability/exclude filters
// 5. Optimize

use tracing::info;

use crate::config::{Config, StrategyConfig};
use crate::model::ScoredPlayer;
use crate::projection::fixtures::EaseTable;
use crate::projection::normalize::build_players;
use crate::projection::scoring::{apply_filters, score_players};
use crate::snapshot::Snapshot;
use crate::squad::optimizer::{optimize, OptimizeError};
use crate::squad::plan::SquadPlan;
use crate::squad::rules::SquadRules;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
}

/// Filtered, scored candidates for one run.
#[derive(Debug, Clone)]
pub struct ScoredPool {
    /// Gameweek the fixture window starts from; None before the season.
    pub gameweek: Option<u32>,
    pub players: Vec<ScoredPlayer>,
}

#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: SquadPlan,
    pub gameweek: Option<u32>,
    /// The candidate table the optimizer chose from.
    pub candidates: Vec<ScoredPlayer>,
}

/// Steps 1-4: everything up to, but not including, the optimizer.
pub fn score_pool(snapshot: &Snapshot, strategy: &StrategyConfig) -> ScoredPool {
    let players = build_players(snapshot);
    let ease = EaseTable::build(&snapshot.events, &snapshot.fixtures, strategy.lookahead);
    match ease.gameweek() {
        Some(gw) => {
            let deadline = snapshot
                .events
                .iter()
                .find(|e| e.id == gw)
                .and_then(|e| e.deadline_time)
                .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
                .unwrap_or_else(|| "unknown".into());
            info!(
                "Fixture ease from gameweek {} (deadline {}) for {} teams (lookahead {})",
                gw,
                deadline,
                ease.len(),
                strategy.lookahead
            )
        }
        None => info!(
            "No current gameweek; fixture ease from all scheduled fixtures for {} teams",
            ease.len()
        ),
    }

    let scored = score_players(players, &ease, strategy);
    let total = scored.len();
    let players = apply_filters(scored, &strategy.filters);
    let locked = players.iter().filter(|p| p.is_locked).count();
    info!(
        "Scored {} players, {} candidates after filters ({} locked)",
        total,
        players.len(),
        locked
    );

    ScoredPool {
        gameweek: ease.gameweek(),
        players,
    }
}

/// Run the whole pipeline.
pub fn plan(snapshot: &Snapshot, config: &Config) -> Result<PlanOutcome, PlanError> {
    let pool = score_pool(snapshot, &config.strategy);
    let rules = SquadRules::from_config(config);
    let plan = optimize(&pool.players, &rules)?;

    Ok(PlanOutcome {
        plan,
        gameweek: pool.gameweek,
        candidates: pool.players,
    })
}
