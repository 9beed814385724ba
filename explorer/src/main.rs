//! Frontier-driven exploration CLI.
//!
//! Runs missions against grid-world maps, and inspects persisted roadmap
//! snapshots. Exit codes are listed in [`explorer::exit_codes`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use explorer::core::types::AgentId;
use explorer::exit_codes;
use explorer::io::config::load_config;
use explorer::io::init::{ExplorerPaths, InitOptions, init_explorer};
use explorer::io::mission_log::{AgentSummary, MissionSummary, generate_run_id, write_run};
use explorer::io::sim::GridWorld;
use explorer::io::snapshot_store::load_snapshot;
use explorer::logging;
use explorer::mission::{MissionStop, run_fleet};
use explorer::select::{SelectOutcome, select_from_snapshot};

#[derive(Parser)]
#[command(
    name = "explorer",
    version,
    about = "Frontier-driven roadmap exploration"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.explorer/` with a default config, a sample world, and the snapshot schema.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },
    /// Explore a grid world until no frontier remains.
    Run {
        /// World map (TOML).
        #[arg(long)]
        world: PathBuf,
        /// Mission config (TOML). Defaults to `.explorer/config.toml`.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of agents sharing one roadmap.
        #[arg(long, default_value_t = 1)]
        agents: usize,
        /// Directory for run artifacts. Defaults to `.explorer/runs`.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check a roadmap snapshot against the schema and graph invariants.
    Validate {
        snapshot: PathBuf,
    },
    /// Print the task an agent would select next on a roadmap snapshot.
    Select {
        snapshot: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Agent id. Defaults to `agent.id` from the config.
        #[arg(long)]
        agent: Option<String>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(force),
        Command::Run {
            world,
            config,
            agents,
            out,
        } => cmd_run(&world, config.as_deref(), agents, out.as_deref()),
        Command::Validate { snapshot } => cmd_validate(&snapshot),
        Command::Select {
            snapshot,
            config,
            agent,
        } => cmd_select(&snapshot, config.as_deref(), agent),
    }
}

fn cmd_init(force: bool) -> Result<i32> {
    let paths = init_explorer(Path::new("."), &InitOptions { force })?;
    println!("init: wrote {}", paths.explorer_dir.display());
    Ok(exit_codes::OK)
}

fn cmd_run(world: &Path, config: Option<&Path>, agents: usize, out: Option<&Path>) -> Result<i32> {
    if agents == 0 {
        bail!("--agents must be at least 1");
    }
    let paths = ExplorerPaths::new(".");
    let config = load_config(config.unwrap_or(paths.config_path.as_path()))?;
    let world_map = GridWorld::load(world)?;

    let run_id = generate_run_id();
    let fleet = run_fleet(vec![world_map; agents], &config).context("run mission")?;
    let stop = fleet.stop();

    let summary = MissionSummary {
        run_id: run_id.clone(),
        world: Some(world.display().to_string()),
        agents: fleet
            .outcomes
            .iter()
            .map(|outcome| AgentSummary {
                agent: outcome.agent.to_string(),
                stop: outcome.stop.as_str().to_string(),
                iterations: outcome.iterations,
                tasks_completed: outcome.tasks_completed,
                tasks_failed: outcome.tasks_failed,
                steps_taken: outcome.steps_taken,
            })
            .collect(),
        waypoints: fleet.snapshot.waypoint_count(),
        frontiers: fleet.snapshot.frontier_count(),
        world_objects: fleet.snapshot.world_object_count(),
    };
    let run_paths = write_run(out.unwrap_or(paths.runs_dir.as_path()), &summary, &fleet.snapshot)?;

    println!("run: {} {}", run_id, stop.as_str());
    for agent in &summary.agents {
        println!(
            "run: agent {} stop={} iterations={} tasks={} failed={} steps={}",
            agent.agent,
            agent.stop,
            agent.iterations,
            agent.tasks_completed,
            agent.tasks_failed,
            agent.steps_taken
        );
    }
    println!(
        "run: waypoints={} frontiers={} world_objects={}",
        summary.waypoints, summary.frontiers, summary.world_objects
    );
    println!("run: artifacts {}", run_paths.dir.display());

    Ok(match stop {
        MissionStop::Complete => exit_codes::OK,
        MissionStop::Stalled => exit_codes::STALLED,
        MissionStop::MaxIterationsExceeded => exit_codes::ITERATION_LIMIT,
    })
}

fn cmd_validate(snapshot: &Path) -> Result<i32> {
    let graph = load_snapshot(snapshot)?;
    println!(
        "valid: {} nodes, {} edges, {} frontiers",
        graph.node_count(),
        graph.edge_count(),
        graph.frontier_count()
    );
    Ok(exit_codes::OK)
}

fn cmd_select(snapshot: &Path, config: Option<&Path>, agent: Option<String>) -> Result<i32> {
    let paths = ExplorerPaths::new(".");
    let config = load_config(config.unwrap_or(paths.config_path.as_path()))?;
    let agent = AgentId::new(agent.unwrap_or_else(|| config.agent.id.clone()));
    match select_from_snapshot(snapshot, &config, &agent)? {
        SelectOutcome::Complete => {
            println!("complete");
            Ok(exit_codes::OK)
        }
        SelectOutcome::Selected(selected) => {
            println!(
                "{} target={} objective={} from={} steps={}",
                selected.task.id,
                selected.task.target,
                selected.task.objective,
                selected.from,
                selected.steps
            );
            Ok(exit_codes::OK)
        }
        SelectOutcome::Stalled => {
            println!("stalled");
            Ok(exit_codes::STALLED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["explorer", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }

    #[test]
    fn parse_run_defaults_to_one_agent() {
        let cli = Cli::parse_from(["explorer", "run", "--world", "w.toml"]);
        let Command::Run { agents, config, .. } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(agents, 1);
        assert!(config.is_none());
    }

    #[test]
    fn parse_select_with_agent() {
        let cli = Cli::parse_from(["explorer", "select", "roadmap.json", "--agent", "scout"]);
        let Command::Select { agent, .. } = cli.command else {
            panic!("expected select");
        };
        assert_eq!(agent.as_deref(), Some("scout"));
    }
}
