// Configuration loading and parsing (league.toml, strategy.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub league: LeagueConfig,
    pub strategy: StrategyConfig,
    pub data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Squad budget in currency-major units (e.g. 100.0).
    pub budget: f64,
    /// Maximum squad members from one club.
    pub max_per_team: usize,
}

// ---------------------------------------------------------------------------
// strategy.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire strategy.toml file.
#[derive(Debug, Clone, Deserialize)]
struct StrategyFile {
    #[serde(default)]
    scoring: ScoringSection,
    weights: ScoringWeights,
    fixtures: FixturesSection,
    #[serde(default)]
    filters: FilterConfig,
    #[serde(default)]
    bias: BiasConfig,
    solver: SolverSection,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ScoringSection {
    #[serde(default)]
    mode: ScoringMode,
}

#[derive(Debug, Clone, Deserialize)]
struct FixturesSection {
    lookahead: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct SolverSection {
    time_limit_secs: u64,
}

/// How a player's score is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Weighted blend of expected points, form and points-per-game, scaled
    /// by fixture ease and chance of playing.
    #[default]
    Weighted,
    /// The provider's own next-gameweek expected points, untouched.
    RawEpNext,
}

/// Non-negative multipliers for each scoring term. A zero weight switches
/// the term off.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ScoringWeights {
    pub ep_next: f64,
    pub form: f64,
    pub ppg: f64,
    pub fixture: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilterConfig {
    /// Keep only players whose status marks them available.
    #[serde(default)]
    pub only_available: bool,
    /// Case-insensitive name substrings that must be in the squad.
    #[serde(default)]
    pub lock: Vec<String>,
    /// Case-insensitive name substrings to drop from the pool.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BiasConfig {
    /// Club short code whose players get boosted; empty or absent disables.
    #[serde(default)]
    pub club: Option<String>,
    #[serde(default)]
    pub boost: f64,
}

/// The public strategy config assembled from the strategy.toml sections.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub mode: ScoringMode,
    pub weights: ScoringWeights,
    pub lookahead: usize,
    pub filters: FilterConfig,
    pub bias: BiasConfig,
    pub time_limit: Duration,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataPaths {
    pub bootstrap: String,
    pub fixtures: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/strategy.toml`, relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- league.toml (required) ---
    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    // --- strategy.toml (required) ---
    let strategy_path = config_dir.join("strategy.toml");
    let strategy_text = read_file(&strategy_path)?;
    let strategy_file: StrategyFile =
        toml::from_str(&strategy_text).map_err(|e| ConfigError::ParseError {
            path: strategy_path.clone(),
            source: e,
        })?;

    let strategy = StrategyConfig {
        mode: strategy_file.scoring.mode,
        weights: strategy_file.weights,
        lookahead: strategy_file.fixtures.lookahead,
        filters: strategy_file.filters,
        bias: strategy_file.bias,
        time_limit: Duration::from_secs(strategy_file.solver.time_limit_secs),
    };

    let config = Config {
        league: league_file.league,
        strategy,
        data_paths: strategy_file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

/// The files `load_config_from` reads from `config/`.
const CONFIG_FILES: [&str; 2] = ["league.toml", "strategy.toml"];

/// Seed `config/` with whichever of `CONFIG_FILES` it lacks, copying them
/// from `defaults/`. Files already in `config/` are never overwritten and
/// nothing else in `defaults/` is touched. Returns the seeded paths.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    let missing: Vec<&str> = CONFIG_FILES
        .into_iter()
        .filter(|name| !config_dir.join(name).exists())
        .collect();
    if missing.is_empty() {
        return Ok(vec![]);
    }

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        // Loading reports the missing file.
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut seeded = Vec::new();
    for name in missing {
        let source = defaults_dir.join(name);
        if !source.is_file() {
            continue;
        }
        let target = config_dir.join(name);
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {} to {}: {e}", source.display(), target.display()),
        })?;
        info!("Seeded {} from defaults", target.display());
        seeded.push(target);
    }

    Ok(seeded)
}

/// Loads config relative to `base_dir`, copying defaults into place first.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check a fully assembled config. Public so callers that override fields
/// (e.g. from command-line flags) can re-validate.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let budget = config.league.budget;
    if !budget.is_finite() || budget <= 0.0 {
        return Err(invalid("league.budget", format!("must be > 0, got {budget}")));
    }

    let cap = config.league.max_per_team;
    if !(1..=3).contains(&cap) {
        return Err(invalid(
            "league.max_per_team",
            format!("must be 1, 2 or 3, got {cap}"),
        ));
    }

    let strategy = &config.strategy;
    if strategy.lookahead == 0 {
        return Err(invalid("fixtures.lookahead", "must be >= 1".into()));
    }

    // Weights may be zero (term switched off) but never negative.
    let w = &strategy.weights;
    let weight_fields: &[(&str, f64)] = &[
        ("weights.ep_next", w.ep_next),
        ("weights.form", w.form),
        ("weights.ppg", w.ppg),
        ("weights.fixture", w.fixture),
    ];
    for (name, val) in weight_fields {
        if !val.is_finite() || *val < 0.0 {
            return Err(invalid(name, format!("must be >= 0, got {val}")));
        }
    }

    let boost = strategy.bias.boost;
    if !boost.is_finite() || boost < 0.0 {
        return Err(invalid("bias.boost", format!("must be >= 0, got {boost}")));
    }

    if strategy.time_limit.is_zero() {
        return Err(invalid("solver.time_limit_secs", "must be > 0".into()));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
