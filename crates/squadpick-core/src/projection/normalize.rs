// Raw provider records -> clean numeric player fields.
//
// Normalization never fails: stat fields that are absent, null, non-numeric
// or non-finite degrade to a fixed default instead of aborting the run.

use serde_json::Value;

use crate::model::Player;
use crate::snapshot::{RawElement, Snapshot};

/// Default for `form`, `ppg` and `ep_next` when the source value is unusable.
pub const STAT_DEFAULT: f64 = 0.0;

/// Default chance of playing when the provider leaves it empty: assume the
/// player is fully available.
pub const CHANCE_DEFAULT: f64 = 1.0;

/// Team code shown for players whose team id the snapshot does not list.
pub const UNKNOWN_TEAM: &str = "???";

/// Numeric fields of one player after coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedStats {
    pub cost: f64,
    pub form: f64,
    pub ppg: f64,
    pub ep_next: f64,
    pub chance_next: f64,
}

/// Read a JSON number or a string holding one. Anything else, including
/// NaN and infinities, yields None.
pub fn lenient_f64(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

/// Coerce one raw record.
pub fn normalize(raw: &RawElement) -> NormalizedStats {
    NormalizedStats {
        cost: raw.now_cost / 10.0,
        form: lenient_f64(raw.form.as_ref()).unwrap_or(STAT_DEFAULT),
        ppg: lenient_f64(raw.points_per_game.as_ref()).unwrap_or(STAT_DEFAULT),
        ep_next: lenient_f64(raw.ep_next.as_ref()).unwrap_or(STAT_DEFAULT),
        chance_next: lenient_f64(raw.chance_of_playing_next_round.as_ref())
            .map(|pct| pct / 100.0)
            .unwrap_or(CHANCE_DEFAULT),
    }
}

/// Build the normalized player table for a snapshot, in provider order.
pub fn build_players(snapshot: &Snapshot) -> Vec<Player> {
    snapshot
        .elements
        .iter()
        .map(|raw| {
            let stats = normalize(raw);
            Player {
                id: raw.id,
                name: raw.web_name.clone(),
                team_id: raw.team,
                team_code: snapshot
                    .team_code(raw.team)
                    .unwrap_or(UNKNOWN_TEAM)
                    .to_string(),
                position: raw.position,
                cost: stats.cost,
                status: raw.status.clone().unwrap_or_default(),
                chance_next: stats.chance_next,
                form: stats.form,
                ppg: stats.ppg,
                ep_next: stats.ep_next,
            }
        })
        .collect()
}
