// Player, team and position types shared by the projection and squad stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Playing positions. The provider encodes them as `element_type` 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    /// All positions in canonical squad order.
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];

    /// Map the provider's `element_type` code. Returns None for non-player
    /// entries (the provider also lists managers under other codes).
    pub fn from_element_type(code: u64) -> Option<Self> {
        match code {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }

    /// Parse a position abbreviation.
    ///
    /// Accepts "GKP"/"GK", "DEF", "MID", "FWD" in any case.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GKP" | "GK" => Some(Position::Goalkeeper),
            "DEF" => Some(Position::Defender),
            "MID" => Some(Position::Midfielder),
            "FWD" => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "GKP",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    /// Deterministic ordering index for squad display.
    pub fn sort_order(&self) -> u8 {
        match self {
            Position::Goalkeeper => 0,
            Position::Defender => 1,
            Position::Midfielder => 2,
            Position::Forward => 3,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

/// A club. Strength ratings are carried through untouched; fixture
/// difficulty, not raw strength, drives the ease factor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub short_name: String,
    pub strength: Option<u32>,
    pub strength_attack_home: Option<u32>,
    pub strength_attack_away: Option<u32>,
    pub strength_defence_home: Option<u32>,
    pub strength_defence_away: Option<u32>,
}

/// One eligible player with normalized stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub team_id: u32,
    /// Club short code, "???" when the team id is unknown to the snapshot.
    pub team_code: String,
    pub position: Position,
    /// Price in currency-major units (provider tenths divided by ten).
    pub cost: f64,
    /// Provider status code; "a" means available.
    pub status: String,
    pub chance_next: f64,
    pub form: f64,
    pub ppg: f64,
    pub ep_next: f64,
}

impl Player {
    pub fn is_available(&self) -> bool {
        self.status == "a"
    }
}

/// A player after scoring, ready for the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPlayer {
    #[serde(flatten)]
    pub player: Player,
    pub fixture_factor: f64,
    pub score: f64,
    pub is_locked: bool,
}

impl ScoredPlayer {
    pub fn id(&self) -> u32 {
        self.player.id
    }

    pub fn position(&self) -> Position {
        self.player.position
    }

    pub fn cost(&self) -> f64 {
        self.player.cost
    }

    pub fn team_id(&self) -> u32 {
        self.player.team_id
    }
}
