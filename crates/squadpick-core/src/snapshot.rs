// Data-provider snapshot: the bootstrap-static and fixtures documents.
//
// Records are pulled out of `serde_json::Value` trees field by field so a
// structurally broken record can be reported by kind, index and field name,
// while the lenient stat fields are kept raw for the normalizer.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::model::{Position, Team};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {document}: {source}")]
    Json {
        document: &'static str,
        source: serde_json::Error,
    },

    #[error("{document} has no `{section}` array")]
    MissingSection {
        document: &'static str,
        section: &'static str,
    },

    #[error("{entity} #{index}: missing or malformed field `{field}`")]
    MissingField {
        entity: &'static str,
        index: usize,
        field: &'static str,
    },
}

// ---------------------------------------------------------------------------
// Snapshot records
// ---------------------------------------------------------------------------

/// A player record as delivered by the provider. The four stat fields stay
/// as raw JSON; the normalizer decides what they are worth.
#[derive(Debug, Clone, PartialEq)]
pub struct RawElement {
    pub id: u32,
    pub web_name: String,
    pub team: u32,
    pub position: Position,
    /// Price in tenths of a currency unit.
    pub now_cost: f64,
    pub status: Option<String>,
    pub chance_of_playing_next_round: Option<Value>,
    pub form: Option<Value>,
    pub points_per_game: Option<Value>,
    pub ep_next: Option<Value>,
}

/// A gameweek.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: u32,
    pub is_current: bool,
    pub is_next: bool,
    pub finished: bool,
    pub deadline_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub id: Option<u32>,
    /// Scheduled gameweek; None while the match is unscheduled.
    pub event: Option<u32>,
    pub team_h: u32,
    pub team_a: u32,
    pub team_h_difficulty: i64,
    pub team_a_difficulty: i64,
    pub kickoff_time: Option<DateTime<Utc>>,
}


/// Everything one scoring + optimization run reads. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub elements: Vec<RawElement>,
    pub teams: Vec<Team>,
    pub events: Vec<Event>,
    pub fixtures: Vec<Fixture>,
}

impl Snapshot {
    /// Parse the two provider documents from memory.
    pub fn from_json(bootstrap: &str, fixtures: &str) -> Result<Self, SnapshotError> {
        let boot: Value = serde_json::from_str(bootstrap).map_err(|e| SnapshotError::Json {
            document: "bootstrap",
            source: e,
        })?;
        let fix: Value = serde_json::from_str(fixtures).map_err(|e| SnapshotError::Json {
            document: "fixtures",
            source: e,
        })?;

        let elements = section(&boot, "bootstrap", "elements")?
            .iter()
            .enumerate()
            .filter_map(|(i, v)| parse_element(i, v).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        let teams = section(&boot, "bootstrap", "teams")?
            .iter()
            .enumerate()
            .map(|(i, v)| parse_team(i, v))
            .collect::<Result<Vec<_>, _>>()?;
        let events = section(&boot, "bootstrap", "events")?
            .iter()
            .enumerate()
            .map(|(i, v)| parse_event(i, v))
            .collect::<Result<Vec<_>, _>>()?;

        let fixture_list = fix.as_array().ok_or(SnapshotError::MissingSection {
            document: "fixtures",
            section: "fixtures",
        })?;
        let fixtures = fixture_list
            .iter()
            .enumerate()
            .map(|(i, v)| parse_fixture(i, v))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Snapshot {
            elements,
            teams,
            events,
            fixtures,
        })
    }

    /// Short code for a team id, if the snapshot knows the team.
    pub fn team_code(&self, team_id: u32) -> Option<&str> {
        self.teams
            .iter()
            .find(|t| t.id == team_id)
            .map(|t| t.short_name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Anything that can hand over a fully materialized snapshot. Retrieval and
/// caching policies live behind this trait, outside the core.
pub trait SnapshotSource {
    fn load(&self) -> Result<Snapshot, SnapshotError>;
}

/// Reads the two provider documents from JSON files on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub bootstrap: PathBuf,
    pub fixtures: PathBuf,
}

impl FileSource {
    pub fn new(bootstrap: impl Into<PathBuf>, fixtures: impl Into<PathBuf>) -> Self {
        FileSource {
            bootstrap: bootstrap.into(),
            fixtures: fixtures.into(),
        }
    }
}

impl SnapshotSource for FileSource {
    fn load(&self) -> Result<Snapshot, SnapshotError> {
        let bootstrap = read_file(&self.bootstrap)?;
        let fixtures = read_file(&self.fixtures)?;
        let snapshot = Snapshot::from_json(&bootstrap, &fixtures)?;
        info!(
            "Snapshot loaded: {} players, {} teams, {} events, {} fixtures",
            snapshot.elements.len(),
            snapshot.teams.len(),
            snapshot.events.len(),
            snapshot.fixtures.len()
        );
        Ok(snapshot)
    }
}

fn read_file(path: &Path) -> Result<String, SnapshotError> {
    std::fs::read_to_string(path).map_err(|e| SnapshotError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Record parsing
// ---------------------------------------------------------------------------

fn section<'a>(
    doc: &'a Value,
    document: &'static str,
    name: &'static str,
) -> Result<&'a Vec<Value>, SnapshotError> {
    doc.get(name)
        .and_then(Value::as_array)
        .ok_or(SnapshotError::MissingSection {
            document,
            section: name,
        })
}

/// Field accessor that remembers which record it is reading.
struct Record<'a> {
    entity: &'static str,
    index: usize,
    value: &'a Value,
}

impl<'a> Record<'a> {
    fn missing(&self, field: &'static str) -> SnapshotError {
        SnapshotError::MissingField {
            entity: self.entity,
            index: self.index,
            field,
        }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.value.get(field).filter(|v| !v.is_null())
    }

    fn id(&self, field: &'static str) -> Result<u32, SnapshotError> {
        self.opt_id(field).ok_or_else(|| self.missing(field))
    }

    fn opt_id(&self, field: &str) -> Option<u32> {
        self.get(field)
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
    }

    fn int(&self, field: &'static str) -> Result<i64, SnapshotError> {
        self.get(field)
            .and_then(Value::as_i64)
            .ok_or_else(|| self.missing(field))
    }

    fn number(&self, field: &'static str) -> Result<f64, SnapshotError> {
        self.get(field)
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite())
            .ok_or_else(|| self.missing(field))
    }

    fn string(&self, field: &'static str) -> Result<String, SnapshotError> {
        self.opt_string(field).ok_or_else(|| self.missing(field))
    }

    fn opt_string(&self, field: &str) -> Option<String> {
        self.get(field).and_then(Value::as_str).map(|s| s.to_string())
    }

    fn flag(&self, field: &str) -> bool {
        self.get(field).and_then(Value::as_bool).unwrap_or(false)
    }

    fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
    }

    fn raw(&self, field: &str) -> Option<Value> {
        self.get(field).cloned()
    }
}

/// Returns Ok(None) for entries that are not players (unknown element_type).
fn parse_element(index: usize, value: &Value) -> Result<Option<RawElement>, SnapshotError> {
    let rec = Record {
        entity: "element",
        index,
        value,
    };
    let id = rec.id("id")?;
    let web_name = rec.string("web_name")?;
    let element_type = rec
        .get("element_type")
        .and_then(Value::as_u64)
        .ok_or_else(|| rec.missing("element_type"))?;
    let Some(position) = Position::from_element_type(element_type) else {
        warn!("skipping element {id} '{web_name}': unknown element_type {element_type}");
        return Ok(None);
    };

    Ok(Some(RawElement {
        id,
        web_name,
        team: rec.id("team")?,
        position,
        now_cost: rec.number("now_cost")?,
        status: rec.opt_string("status"),
        chance_of_playing_next_round: rec.raw("chance_of_playing_next_round"),
        form: rec.raw("form"),
        points_per_game: rec.raw("points_per_game"),
        ep_next: rec.raw("ep_next"),
    }))
}

fn parse_team(index: usize, value: &Value) -> Result<Team, SnapshotError> {
    let rec = Record {
        entity: "team",
        index,
        value,
    };
    Ok(Team {
        id: rec.id("id")?,
        name: rec.string("name")?,
        short_name: rec.string("short_name")?,
        strength: rec.opt_id("strength"),
        strength_attack_home: rec.opt_id("strength_attack_home"),
        strength_attack_away: rec.opt_id("strength_attack_away"),
        strength_defence_home: rec.opt_id("strength_defence_home"),
        strength_defence_away: rec.opt_id("strength_defence_away"),
    })
}

fn parse_event(index: usize, value: &Value) -> Result<Event, SnapshotError> {
    let rec = Record {
        entity: "event",
        index,
        value,
    };
    Ok(Event {
        id: rec.id("id")?,
        is_current: rec.flag("is_current"),
        is_next: rec.flag("is_next"),
        finished: rec.flag("finished"),
        deadline_time: rec.timestamp("deadline_time"),
    })
}

fn parse_fixture(index: usize, value: &Value) -> Result<Fixture, SnapshotError> {
    let rec = Record {
        entity: "fixture",
        index,
        value,
    };
    Ok(Fixture {
        id: rec.opt_id("id"),
        event: rec.opt_id("event"),
        team_h: rec.id("team_h")?,
        team_a: rec.id("team_a")?,
        team_h_difficulty: rec.int("team_h_difficulty")?,
        team_a_difficulty: rec.int("team_a_difficulty")?,
        kickoff_time: rec.timestamp("kickoff_time"),
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
