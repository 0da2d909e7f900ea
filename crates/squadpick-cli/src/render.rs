// Plain-text tables and CSV export for squad plans and rankings.

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use squadpick_core::model::ScoredPlayer;
use squadpick_core::squad::plan::{PlanRow, SquadPlan};

/// Flat CSV record; positions as their short codes.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: u32,
    name: &'a str,
    team: &'a str,
    position: &'static str,
    cost: f64,
    score: f64,
    in_xi: bool,
    is_captain: bool,
    is_vice_captain: bool,
    is_locked: bool,
}

impl<'a> From<&'a PlanRow> for CsvRow<'a> {
    fn from(r: &'a PlanRow) -> Self {
        CsvRow {
            id: r.id,
            name: &r.name,
            team: &r.team_code,
            position: r.position.display_str(),
            cost: r.cost,
            score: (r.score * 100.0).round() / 100.0,
            in_xi: r.in_xi,
            is_captain: r.is_captain,
            is_vice_captain: r.is_vice_captain,
            is_locked: r.is_locked,
        }
    }
}

pub fn print_plan(plan: &SquadPlan, gameweek: Option<u32>, budget: f64) {
    print!("{}", render_plan(plan, gameweek, budget));
}

/// The full squad with XI markers, then the starting XI, the bench in
/// substitution order and the totals.
fn render_plan(plan: &SquadPlan, gameweek: Option<u32>, budget: f64) -> String {
    let mut out = String::new();
    match gameweek {
        Some(gw) => out.push_str(&format!("Squad for gameweek {gw}\n\n")),
        None => out.push_str("Squad (pre-season)\n\n"),
    }
    render_rows(&mut out, "Squad", &plan.squad, true);
    render_rows(&mut out, "Starting XI", &plan.starting_xi, false);
    render_rows(&mut out, "Bench", &plan.bench, false);
    out.push_str(&format!(
        "Spent: {:.1} / {:.1}   Predicted points: {:.2}\n",
        plan.spent, budget, plan.predicted_points
    ));
    out
}

fn render_rows(out: &mut String, title: &str, rows: &[PlanRow], mark_xi: bool) {
    out.push_str(&format!("{title}\n"));
    out.push_str(&format!(
        "  {:<4} {:<20} {:<5} {:>6} {:>7}  {}\n",
        "Pos",
        "Name",
        "Team",
        "Cost",
        "Score",
        if mark_xi { "XI" } else { "" }
    ));
    for r in rows {
        let xi = match (mark_xi, r.in_xi) {
            (true, true) => "XI ",
            (true, false) => "-  ",
            (false, _) => "",
        };
        let badge = if r.is_captain {
            "(C)"
        } else if r.is_vice_captain {
            "(V)"
        } else {
            ""
        };
        let lock = if r.is_locked { "*" } else { "" };
        out.push_str(&format!(
            "  {:<4} {:<20} {:<5} {:>6.1} {:>7.2}  {xi}{badge}{lock}\n",
            r.position.display_str(),
            r.name,
            r.team_code,
            r.cost,
            r.score
        ));
    }
    out.push('\n');
}

pub fn print_ranking(players: &[&ScoredPlayer]) {
    println!(
        "{:>4}  {:<4} {:<20} {:<5} {:>6} {:>6} {:>7}",
        "#", "Pos", "Name", "Team", "Cost", "Ease", "Score"
    );
    for (i, p) in players.iter().enumerate() {
        println!(
            "{:>4}  {:<4} {:<20} {:<5} {:>6.1} {:>6.2} {:>7.2}{}",
            i + 1,
            p.position().display_str(),
            p.player.name,
            p.player.team_code,
            p.cost(),
            p.fixture_factor,
            p.score,
            if p.is_locked { " *" } else { "" }
        );
    }
}

/// Write squad.csv, starting_xi.csv and bench.csv into `dir`.
pub fn export_csv(plan: &SquadPlan, dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    write_rows(&dir.join("squad.csv"), &plan.squad)?;
    write_rows(&dir.join("starting_xi.csv"), &plan.starting_xi)?;
    write_rows(&dir.join("bench.csv"), &plan.bench)?;
    Ok(())
}

fn write_rows(path: &Path, rows: &[PlanRow]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    for row in rows {
        writer.serialize(CsvRow::from(row))?;
    }
    writer.flush()?;
    Ok(())
}
