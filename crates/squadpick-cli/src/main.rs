// Squad picker entry point.
//
// Startup sequence:
// 1. Parse arguments, initialize tracing (stderr, stdout is for tables)
// 2. Load config, apply command-line overrides, re-validate
// 3. Load the provider snapshot from disk
// 4. Run the requested command

mod render;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use squadpick_core::config::{self, Config};
use squadpick_core::model::Position;
use squadpick_core::pipeline;
use squadpick_core::projection::scoring::rank;
use squadpick_core::snapshot::{FileSource, Snapshot, SnapshotSource};

#[derive(Debug, Parser)]
#[command(name = "squadpick", about = "Fantasy football squad optimizer", long_about = None)]
struct Cli {
    /// Directory holding `config/` (seeded from `defaults/` on first run).
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Overrides shared by every command that reads the snapshot.
#[derive(Debug, Args)]
struct DataArgs {
    /// Path to the bootstrap-static JSON document.
    #[arg(long)]
    bootstrap: Option<PathBuf>,

    /// Path to the fixtures JSON document.
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Number of upcoming fixtures averaged per team.
    #[arg(long)]
    lookahead: Option<usize>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pick the optimal 15-man squad, starting XI and captain.
    Pick {
        #[command(flatten)]
        data: DataArgs,

        /// Squad budget (e.g. 100.0).
        #[arg(long)]
        budget: Option<f64>,

        /// Maximum players from one club (1-3).
        #[arg(long)]
        max_per_team: Option<usize>,

        /// Write squad.csv, starting_xi.csv and bench.csv into this directory.
        #[arg(long)]
        export: Option<PathBuf>,

        /// Print the plan as JSON instead of tables.
        #[arg(long)]
        json: bool,
    },

    /// List the highest-scored candidates after filtering.
    Rank {
        #[command(flatten)]
        data: DataArgs,

        /// Number of players to show.
        #[arg(long, default_value_t = 50)]
        top: usize,

        /// Only this position (GKP, DEF, MID, FWD).
        #[arg(long, value_parser = parse_position)]
        position: Option<Position>,
    },
}

fn parse_position(s: &str) -> Result<Position, String> {
    Position::from_str_pos(s)
        .ok_or_else(|| format!("unknown position '{s}' (use GKP, DEF, MID or FWD)"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let mut config =
        config::load_config(&cli.config_dir).context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, budget {:.1}, max {} per team",
        config.league.name, config.league.budget, config.league.max_per_team
    );

    match cli.command {
        Command::Pick {
            data,
            budget,
            max_per_team,
            export,
            json,
        } => {
            if let Some(budget) = budget {
                config.league.budget = budget;
            }
            if let Some(cap) = max_per_team {
                config.league.max_per_team = cap;
            }
            apply_data_args(&mut config, &data);
            config::validate(&config).context("invalid command-line override")?;

            let snapshot = load_snapshot(&cli.config_dir, &config)?;
            let outcome =
                pipeline::plan(&snapshot, &config).context("squad optimization failed")?;

            if json {
                let text = serde_json::to_string_pretty(&outcome.plan)
                    .context("failed to serialize plan")?;
                println!("{text}");
            } else {
                render::print_plan(&outcome.plan, outcome.gameweek, config.league.budget);
            }

            if let Some(dir) = export {
                render::export_csv(&outcome.plan, &dir)
                    .with_context(|| format!("failed to export CSV to {}", dir.display()))?;
                info!("Exported squad tables to {}", dir.display());
            }
        }
        Command::Rank {
            data,
            top,
            position,
        } => {
            apply_data_args(&mut config, &data);
            config::validate(&config).context("invalid command-line override")?;

            let snapshot = load_snapshot(&cli.config_dir, &config)?;
            let mut pool = pipeline::score_pool(&snapshot, &config.strategy);
            if let Some(position) = position {
                pool.players.retain(|p| p.position() == position);
            }
            render::print_ranking(&rank(&pool.players, top));
        }
    }

    Ok(())
}

fn apply_data_args(config: &mut Config, data: &DataArgs) {
    if let Some(path) = &data.bootstrap {
        config.data_paths.bootstrap = path.display().to_string();
    }
    if let Some(path) = &data.fixtures {
        config.data_paths.fixtures = path.display().to_string();
    }
    if let Some(lookahead) = data.lookahead {
        config.strategy.lookahead = lookahead;
    }
}

/// Relative data paths resolve against the config directory.
fn load_snapshot(base_dir: &Path, config: &Config) -> anyhow::Result<Snapshot> {
    let resolve = |p: &str| {
        let path = Path::new(p);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    };
    let source = FileSource::new(
        resolve(&config.data_paths.bootstrap),
        resolve(&config.data_paths.fixtures),
    );
    source.load().context("failed to load provider snapshot")
}

/// Initialize tracing to stderr so tables and JSON on stdout stay clean.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("squadpick=info,squadpick_core=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
