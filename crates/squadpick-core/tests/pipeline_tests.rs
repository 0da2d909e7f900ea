// Integration tests for the squad picker.
//
// These tests drive the library end-to-end from provider-shaped JSON
// documents: snapshot parsing, normalization, fixture ease, scoring,
// filtering and the squad optimizer.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};

use squadpick_core::config::{
    BiasConfig, Config, DataPaths, FilterConfig, LeagueConfig, ScoringMode, ScoringWeights,
    StrategyConfig,
};
use squadpick_core::model::Position;
use squadpick_core::pipeline::{plan, score_pool, PlanError};
use squadpick_core::snapshot::{FileSource, Snapshot, SnapshotError, SnapshotSource};
use squadpick_core::squad::feasibility::InfeasibleReason;
use squadpick_core::squad::optimizer::OptimizeError;
use squadpick_core::squad::plan::SquadPlan;
use squadpick_core::squad::rules::{limits, SQUAD_SIZE, XI_SIZE};

// ===========================================================================
// Test helpers
// ===========================================================================

/// Per-club roster: element_type and name prefix.
const LAYOUT: [(u32, &str); 6] = [
    (1, "Keeper"),
    (2, "Back"),
    (2, "Back"),
    (3, "Mid"),
    (3, "Mid"),
    (4, "Striker"),
];

fn element(
    id: u32,
    name: &str,
    team: u32,
    element_type: u32,
    now_cost: u32,
    ep_next: f64,
) -> Value {
    json!({
        "id": id,
        "web_name": name,
        "team": team,
        "element_type": element_type,
        "now_cost": now_cost,
        "status": "a",
        "chance_of_playing_next_round": null,
        "form": "2.0",
        "points_per_game": "3.0",
        "ep_next": format!("{ep_next:.1}"),
    })
}

/// Six players per club with deterministic prices (4.0-7.5) and projections.
/// Names look like "Mid-C3-4".
fn league(clubs: u32) -> Vec<Value> {
    let mut out = Vec::new();
    for team in 1..=clubs {
        for (k, &(element_type, prefix)) in LAYOUT.iter().enumerate() {
            let id = team * 10 + k as u32;
            let cost = 40 + ((id * 3) % 8) * 5;
            let ep = 2.0 + ((id * 7) % 11) as f64 * 0.5;
            out.push(element(id, &format!("{prefix}-C{team}-{k}"), team, element_type, cost, ep));
        }
    }
    out
}

fn bootstrap(clubs: u32, elements: Vec<Value>) -> String {
    let teams: Vec<Value> = (1..=clubs)
        .map(|t| json!({"id": t, "name": format!("Club {t}"), "short_name": format!("C{t}")}))
        .collect();
    json!({
        "elements": elements,
        "teams": teams,
        "events": [
            {"id": 1, "is_current": false, "is_next": false, "finished": true},
            {"id": 2, "is_current": true, "is_next": false, "finished": false},
            {"id": 3, "is_current": false, "is_next": true, "finished": false}
        ]
    })
    .to_string()
}

/// Gameweeks 2-4, clubs paired off (1 v 2, 3 v 4, ...).
fn fixtures(clubs: u32) -> String {
    let mut out = Vec::new();
    let mut id = 1;
    for gw in 2..=4u32 {
        for home in (1..=clubs).step_by(2) {
            let away = if home == clubs { 1 } else { home + 1 };
            out.push(json!({
                "id": id, "event": gw, "team_h": home, "team_a": away,
                "team_h_difficulty": (home % 5) + 1,
                "team_a_difficulty": (away % 5) + 1
            }));
            id += 1;
        }
    }
    Value::Array(out).to_string()
}

fn snapshot(clubs: u32, elements: Vec<Value>) -> Snapshot {
    Snapshot::from_json(&bootstrap(clubs, elements), &fixtures(clubs)).expect("valid snapshot")
}

fn config() -> Config {
    Config {
        league: LeagueConfig {
            name: "Test League".into(),
            budget: 100.0,
            max_per_team: 3,
        },
        strategy: StrategyConfig {
            mode: ScoringMode::Weighted,
            weights: ScoringWeights {
                ep_next: 0.5,
                form: 0.3,
                ppg: 0.2,
                fixture: 0.2,
            },
            lookahead: 3,
            filters: FilterConfig {
                only_available: true,
                lock: Vec::new(),
                exclude: Vec::new(),
            },
            bias: BiasConfig::default(),
            time_limit: Duration::from_secs(60),
        },
        data_paths: DataPaths {
            bootstrap: "data/bootstrap-static.json".into(),
            fixtures: "data/fixtures.json".into(),
        },
    }
}

fn assert_legal(plan: &SquadPlan, budget: f64, cap: usize) {
    assert_eq!(plan.squad.len(), SQUAD_SIZE);
    assert_eq!(plan.starting_xi.len(), XI_SIZE);
    assert_eq!(plan.bench.len(), SQUAD_SIZE - XI_SIZE);

    for position in Position::ALL {
        let l = limits(position);
        let squad = plan.squad.iter().filter(|r| r.position == position).count();
        let xi = plan.starting_xi.iter().filter(|r| r.position == position).count();
        assert_eq!(squad, l.squad, "{position} in squad");
        assert!(xi >= l.xi_min && xi <= l.xi_max, "{position} in XI: {xi}");
    }

    assert!(plan.spent <= budget + 1e-6, "spent {} over {}", plan.spent, budget);
    let mut per_club: HashMap<&str, usize> = HashMap::new();
    for r in &plan.squad {
        *per_club.entry(r.team_code.as_str()).or_default() += 1;
    }
    for (club, n) in per_club {
        assert!(n <= cap, "{n} players from {club}");
    }

    let captains: Vec<_> = plan.squad.iter().filter(|r| r.is_captain).collect();
    assert_eq!(captains.len(), 1);
    assert!(captains[0].in_xi);
    assert!(plan.starting_xi.iter().any(|r| r.id == plan.captain));
}

// ===========================================================================
// Full pipeline
// ===========================================================================

#[test]
fn default_run_produces_a_legal_squad() {
    let snap = snapshot(8, league(8));
    let cfg = config();
    let outcome = plan(&snap, &cfg).expect("feasible");

    assert_legal(&outcome.plan, 100.0, 3);
    assert_eq!(outcome.gameweek, Some(2));
    assert_eq!(outcome.candidates.len(), 48);

    let spent: f64 = outcome.plan.squad.iter().map(|r| r.cost).sum();
    assert!((outcome.plan.spent - spent).abs() < 1e-9);

    let xi: f64 = outcome.plan.starting_xi.iter().map(|r| r.score).sum();
    let captain = outcome.plan.captain_row().expect("captain in squad");
    assert!((outcome.plan.predicted_points - (xi + captain.score)).abs() < 1e-9);
}

#[test]
fn tight_budget_and_cap_are_respected() {
    let snap = snapshot(8, league(8));
    let mut cfg = config();
    cfg.league.budget = 80.0;
    cfg.league.max_per_team = 2;
    let outcome = plan(&snap, &cfg).expect("feasible");
    assert_legal(&outcome.plan, 80.0, 2);
}

#[test]
fn bench_is_weakest_outfielder_first_keeper_last() {
    let outcome = plan(&snapshot(8, league(8)), &config()).unwrap();
    let bench = &outcome.plan.bench;

    assert_eq!(bench[3].position, Position::Goalkeeper);
    for pair in bench[..3].windows(2) {
        assert!(pair[0].score <= pair[1].score);
    }
    assert!(bench.iter().all(|r| !r.in_xi));
}

#[test]
fn better_keeper_starts_when_price_is_equal() {
    // Raw expected points only, so score == ep_next * chance_next.
    let clubs = 6;
    let mut elements: Vec<Value> = league(clubs)
        .into_iter()
        .filter(|e| e["element_type"] != json!(1))
        .collect();
    elements.push(element(901, "Keeper-Alpha", 1, 1, 40, 5.0));
    elements.push(element(902, "Keeper-Beta", 2, 1, 40, 3.0));

    let mut cfg = config();
    cfg.strategy.weights = ScoringWeights {
        ep_next: 1.0,
        form: 0.0,
        ppg: 0.0,
        fixture: 0.0,
    };
    let outcome = plan(&snapshot(clubs, elements), &cfg).unwrap();

    for p in &outcome.candidates {
        assert!((p.score - p.player.ep_next * p.player.chance_next).abs() < 1e-9);
    }
    let starting_keeper: Vec<u32> = outcome
        .plan
        .starting_xi
        .iter()
        .filter(|r| r.position == Position::Goalkeeper)
        .map(|r| r.id)
        .collect();
    assert_eq!(starting_keeper, vec![901]);
    assert_eq!(outcome.plan.bench.last().map(|r| r.id), Some(902));
}

#[test]
fn repeated_runs_agree_on_predicted_points() {
    let snap = snapshot(8, league(8));
    let cfg = config();
    let a = plan(&snap, &cfg).unwrap();
    let b = plan(&snap, &cfg).unwrap();
    assert!((a.plan.predicted_points - b.plan.predicted_points).abs() < 1e-6);
}

// ===========================================================================
// Locks, excludes and availability
// ===========================================================================

#[test]
fn locked_player_is_in_every_squad() {
    let snap = snapshot(8, league(8));
    let pool = score_pool(&snap, &config().strategy);
    let weakest = pool
        .players
        .iter()
        .filter(|p| p.position() == Position::Forward)
        .min_by(|a, b| a.score.total_cmp(&b.score))
        .map(|p| p.player.name.clone())
        .unwrap();

    let mut cfg = config();
    cfg.strategy.filters.lock = vec![weakest.to_lowercase()];
    let outcome = plan(&snap, &cfg).unwrap();
    let row = outcome
        .plan
        .squad
        .iter()
        .find(|r| r.name == weakest)
        .expect("locked player selected");
    assert!(row.is_locked);
}

#[test]
fn lock_beats_exclude_and_availability() {
    let mut elements = league(8);
    elements.push(json!({
        "id": 999, "web_name": "Crocked", "team": 3, "element_type": 4,
        "now_cost": 45, "status": "i", "chance_of_playing_next_round": 0,
        "form": "0.0", "points_per_game": "1.0", "ep_next": "0.0"
    }));
    let mut cfg = config();
    cfg.strategy.filters.lock = vec!["crock".into()];
    cfg.strategy.filters.exclude = vec!["CROCKED".into()];

    let outcome = plan(&snapshot(8, elements), &cfg).unwrap();
    assert!(outcome.plan.squad.iter().any(|r| r.id == 999));
    assert_legal(&outcome.plan, 100.0, 3);
}

#[test]
fn excluded_and_unavailable_players_never_selected() {
    let mut elements = league(8);
    elements[0]["status"] = json!("d");
    let snap = snapshot(8, elements);

    let top = score_pool(&snap, &config().strategy)
        .players
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|p| p.player.name.clone())
        .unwrap();

    let mut cfg = config();
    cfg.strategy.filters.exclude = vec![top.clone()];
    let outcome = plan(&snap, &cfg).unwrap();

    assert!(outcome.candidates.iter().all(|p| p.player.name != top));
    assert!(outcome.candidates.iter().all(|p| p.id() != 10));
    assert!(outcome.plan.squad.iter().all(|r| r.name != top && r.id != 10));
}

#[test]
fn unavailable_players_kept_when_filter_off() {
    let mut elements = league(8);
    elements[0]["status"] = json!("d");
    let mut cfg = config();
    cfg.strategy.filters.only_available = false;
    let pool = score_pool(&snapshot(8, elements), &cfg.strategy);
    assert!(pool.players.iter().any(|p| p.id() == 10));
}

// ===========================================================================
// Infeasibility and timeouts
// ===========================================================================

#[test]
fn locking_every_keeper_is_infeasible() {
    let mut cfg = config();
    cfg.strategy.filters.lock = vec!["keeper".into()];
    match plan(&snapshot(8, league(8)), &cfg) {
        Err(PlanError::Optimize(OptimizeError::Infeasible(InfeasibleReason::LockedQuota {
            position: Position::Goalkeeper,
            locked: 8,
            allowed: 2,
        }))) => {}
        other => panic!("expected LockedQuota, got: {other:?}"),
    }
}

#[test]
fn cap_of_one_needs_fifteen_clubs() {
    let mut cfg = config();
    cfg.league.max_per_team = 1;
    match plan(&snapshot(8, league(8)), &cfg) {
        Err(PlanError::Optimize(OptimizeError::Infeasible(InfeasibleReason::TeamCap {
            cap: 1,
            ..
        }))) => {}
        other => panic!("expected TeamCap, got: {other:?}"),
    }
}

#[test]
fn budget_below_cheapest_squad_is_infeasible() {
    let mut cfg = config();
    cfg.league.budget = 50.0;
    let err = plan(&snapshot(8, league(8)), &cfg).unwrap_err();
    match err {
        PlanError::Optimize(OptimizeError::Infeasible(InfeasibleReason::Budget {
            cheapest,
            budget,
        })) => {
            assert!((cheapest - 66.5).abs() < 1e-9);
            assert_eq!(budget, 50.0);
        }
        other => panic!("expected Budget, got: {other:?}"),
    }
    let msg = plan(&snapshot(8, league(8)), &cfg).unwrap_err().to_string();
    assert!(msg.contains("raise the budget"), "{msg}");
}

#[test]
fn empty_pool_is_infeasible_not_a_panic() {
    let snap = snapshot(4, Vec::new());
    match plan(&snap, &config()) {
        Err(PlanError::Optimize(OptimizeError::Infeasible(InfeasibleReason::PositionSupply {
            available: 0,
            ..
        }))) => {}
        other => panic!("expected PositionSupply, got: {other:?}"),
    }
}

#[test]
fn exhausted_time_limit_is_a_timeout() {
    let mut cfg = config();
    cfg.strategy.time_limit = Duration::from_nanos(1);
    match plan(&snapshot(8, league(8)), &cfg) {
        Err(PlanError::Optimize(OptimizeError::Timeout { limit })) => {
            assert_eq!(limit, Duration::from_nanos(1))
        }
        other => panic!("expected Timeout, got: {other:?}"),
    }
}

// ===========================================================================
// Scoring inputs
// ===========================================================================

#[test]
fn malformed_form_degrades_to_zero() {
    let mut elements = league(4);
    elements[1]["form"] = json!("n/a");
    elements[2].as_object_mut().unwrap().remove("form");
    let snap = snapshot(4, elements);

    let mut strategy = config().strategy;
    strategy.weights.fixture = 0.0;
    let pool = score_pool(&snap, &strategy);

    for id in [11, 12] {
        let p = pool.players.iter().find(|p| p.id() == id).unwrap();
        assert_eq!(p.player.form, 0.0);
        let expected = 0.5 * p.player.ep_next + 0.2 * p.player.ppg;
        assert!((p.score - expected).abs() < 1e-9);
        assert!(p.score > 0.0);
    }
}

#[test]
fn club_bias_boosts_only_that_club() {
    let snap = snapshot(4, league(4));
    let plain = score_pool(&snap, &config().strategy);

    let mut strategy = config().strategy;
    strategy.bias = BiasConfig {
        club: Some("c2".into()),
        boost: 0.25,
    };
    let biased = score_pool(&snap, &strategy);

    for (a, b) in plain.players.iter().zip(biased.players.iter()) {
        let ratio = if a.team_id() == 2 { 1.25 } else { 1.0 };
        assert!((b.score - a.score * ratio).abs() < 1e-9);
    }
}

#[test]
fn raw_mode_uses_provider_projection() {
    let snap = snapshot(4, league(4));
    let mut strategy = config().strategy;
    strategy.mode = ScoringMode::RawEpNext;
    strategy.bias = BiasConfig {
        club: Some("C1".into()),
        boost: 1.0,
    };
    for p in score_pool(&snap, &strategy).players {
        assert_eq!(p.score, p.player.ep_next);
    }
}

#[test]
fn no_events_means_every_scheduled_fixture_counts() {
    let boot = json!({"elements": league(2), "teams": [
        {"id": 1, "name": "Club 1", "short_name": "C1"},
        {"id": 2, "name": "Club 2", "short_name": "C2"}
    ], "events": []})
    .to_string();
    let snap = Snapshot::from_json(&boot, &fixtures(2)).unwrap();
    let pool = score_pool(&snap, &config().strategy);
    assert_eq!(pool.gameweek, None);
    // Club 1 hosts at difficulty 2 every week: factor 1.1.
    let club1 = pool.players.iter().find(|p| p.team_id() == 1).unwrap();
    assert!((club1.fixture_factor - 1.1).abs() < 1e-9);
}

// ===========================================================================
// Snapshot files
// ===========================================================================

#[test]
fn file_source_reads_both_documents() {
    let dir = std::env::temp_dir().join("squadpick_test_file_source");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let boot_path = dir.join("bootstrap-static.json");
    let fix_path = dir.join("fixtures.json");
    std::fs::write(&boot_path, bootstrap(4, league(4))).unwrap();
    std::fs::write(&fix_path, fixtures(4)).unwrap();

    let snap = FileSource::new(&boot_path, &fix_path).load().unwrap();
    assert_eq!(snap.elements.len(), 24);
    assert_eq!(snap.teams.len(), 4);
    assert_eq!(snap.fixtures.len(), 6);

    let missing = FileSource::new(dir.join("nope.json"), &fix_path).load();
    assert!(matches!(missing, Err(SnapshotError::Io { .. })));

    let _ = std::fs::remove_dir_all(&dir);
}
