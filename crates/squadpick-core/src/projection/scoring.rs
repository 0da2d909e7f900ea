// Player scoring, club bias, and the lock/exclude/availability rules.
//
// Scores are computed for every player first; filtering then reduces the
// pool without touching the scores of whoever remains.

use std::cmp::Ordering;

use tracing::debug;

use crate::config::{BiasConfig, FilterConfig, ScoringMode, ScoringWeights, StrategyConfig};
use crate::model::{Player, ScoredPlayer};
use crate::projection::fixtures::EaseTable;

// ---------------------------------------------------------------------------
// Score formula
// ---------------------------------------------------------------------------

/// Score one player before any club bias.
///
/// Weighted mode:
/// `(w_ep*ep_next + w_form*form + w_ppg*ppg) * (1 - w_fix + w_fix*ease) * chance_next`
pub fn base_score(player: &Player, ease: f64, weights: &ScoringWeights, mode: ScoringMode) -> f64 {
    match mode {
        ScoringMode::RawEpNext => player.ep_next,
        ScoringMode::Weighted => {
            let stats = weights.ep_next * player.ep_next
                + weights.form * player.form
                + weights.ppg * player.ppg;
            let fixture = 1.0 - weights.fixture + weights.fixture * ease;
            stats * fixture * player.chance_next
        }
    }
}

/// Multiplier for a player's club under the configured bias, 1.0 if none.
pub fn bias_multiplier(bias: &BiasConfig, team_code: &str) -> f64 {
    match bias.club.as_deref().map(str::trim) {
        Some(club)
            if !club.is_empty() && bias.boost > 0.0 && club.eq_ignore_ascii_case(team_code) =>
        {
            1.0 + bias.boost
        }
        _ => 1.0,
    }
}

// ---------------------------------------------------------------------------
// Name rules
// ---------------------------------------------------------------------------

/// Case-insensitive substring patterns. Blank patterns never match.
#[derive(Debug, Clone, Default)]
pub struct NamePatterns {
    patterns: Vec<String>,
}

impl NamePatterns {
    pub fn new(raw: &[String]) -> Self {
        let patterns = raw
            .iter()
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        NamePatterns { patterns }
    }

    pub fn matches(&self, name: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let name = name.to_lowercase();
        self.patterns.iter().any(|p| name.contains(p.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// Score every player and flag locks. No player is removed here.
pub fn score_players(
    players: Vec<Player>,
    ease: &EaseTable,
    strategy: &StrategyConfig,
) -> Vec<ScoredPlayer> {
    let locks = NamePatterns::new(&strategy.filters.lock);

    players
        .into_iter()
        .map(|player| {
            let fixture_factor = ease.factor(player.team_id);
            let mut score = base_score(&player, fixture_factor, &strategy.weights, strategy.mode);
            if strategy.mode == ScoringMode::Weighted {
                score *= bias_multiplier(&strategy.bias, &player.team_code);
            }
            let is_locked = locks.matches(&player.name);
            ScoredPlayer {
                player,
                fixture_factor,
                score,
                is_locked,
            }
        })
        .collect()
}

/// Reduce the scored pool to the optimizer's candidates.
///
/// Locked players always survive: a lock wins over both the availability
/// filter and the exclude list.
pub fn apply_filters(players: Vec<ScoredPlayer>, filters: &FilterConfig) -> Vec<ScoredPlayer> {
    let excludes = NamePatterns::new(&filters.exclude);
    let before = players.len();

    let kept: Vec<ScoredPlayer> = players
        .into_iter()
        .filter(|p| {
            if p.is_locked {
                return true;
            }
            if filters.only_available && !p.player.is_available() {
                return false;
            }
            !excludes.matches(&p.player.name)
        })
        .collect();

    debug!("Filters kept {} of {} players", kept.len(), before);
    kept
}

/// The `n` highest-scored players, ties broken by id.
pub fn rank(players: &[ScoredPlayer], n: usize) -> Vec<&ScoredPlayer> {
    let mut sorted: Vec<&ScoredPlayer> = players.iter().collect();
    sorted.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id().cmp(&b.id()))
    });
    sorted.truncate(n);
    sorted
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
