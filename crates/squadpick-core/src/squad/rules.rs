// Squad and starting-XI composition rules plus the run's constraint set.

use std::time::Duration;

use crate::config::Config;
use crate::model::Position;

pub const SQUAD_SIZE: usize = 15;
pub const XI_SIZE: usize = 11;

/// Slack added to the budget so that sums of one-decimal prices don't fail
/// on float rounding.
pub const BUDGET_TOLERANCE: f64 = 1e-6;

/// How many players of one position the squad and the XI take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionLimits {
    pub squad: usize,
    pub xi_min: usize,
    pub xi_max: usize,
}

/// Fixed game rules: 2/5/5/3 squad, XI of 1 GKP, 3-5 DEF, 2-5 MID, 1-3 FWD.
pub fn limits(position: Position) -> PositionLimits {
    match position {
        Position::Goalkeeper => PositionLimits {
            squad: 2,
            xi_min: 1,
            xi_max: 1,
        },
        Position::Defender => PositionLimits {
            squad: 5,
            xi_min: 3,
            xi_max: 5,
        },
        Position::Midfielder => PositionLimits {
            squad: 5,
            xi_min: 2,
            xi_max: 5,
        },
        Position::Forward => PositionLimits {
            squad: 3,
            xi_min: 1,
            xi_max: 3,
        },
    }
}

/// The configurable part of the constraint set.
#[derive(Debug, Clone, PartialEq)]
pub struct SquadRules {
    pub budget: f64,
    pub max_per_team: usize,
    pub time_limit: Duration,
}

impl SquadRules {
    pub fn from_config(config: &Config) -> Self {
        SquadRules {
            budget: config.league.budget,
            max_per_team: config.league.max_per_team,
            time_limit: config.strategy.time_limit,
        }
    }

    /// Whether a total cost fits the budget.
    pub fn within_budget(&self, cost: f64) -> bool {
        cost <= self.budget + BUDGET_TOLERANCE
    }
}
