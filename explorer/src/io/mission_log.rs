//! Run artifacts written under `<out>/<run-id>/`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};
use serde::{Deserialize, Serialize};

use crate::core::snapshot::GraphSnapshot;
use crate::io::snapshot_store::write_snapshot;

/// Summary of one finished mission run (`meta.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionSummary {
    pub run_id: String,
    /// World file the run was driven by, if any.
    pub world: Option<String>,
    pub agents: Vec<AgentSummary>,
    pub waypoints: usize,
    pub frontiers: usize,
    pub world_objects: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub agent: String,
    /// Why the agent's loop stopped (`complete`, `stalled`, `max_iterations`).
    pub stop: String,
    pub iterations: u32,
    pub tasks_completed: u32,
    pub tasks_failed: u32,
    pub steps_taken: u64,
}

#[derive(Debug, Clone)]
pub struct RunPaths {
    pub dir: PathBuf,
    pub meta_path: PathBuf,
    pub roadmap_path: PathBuf,
}

impl RunPaths {
    pub fn new(out_dir: &Path, run_id: &str) -> Self {
        let dir = out_dir.join(run_id);
        Self {
            meta_path: dir.join("meta.json"),
            roadmap_path: dir.join("roadmap.json"),
            dir,
        }
    }
}

/// `run-` followed by six lowercase alphanumerics.
pub fn generate_run_id() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!("run-{}", suffix.to_lowercase())
}

pub fn write_run(out_dir: &Path, meta: &MissionSummary, snapshot: &GraphSnapshot) -> Result<RunPaths> {
    let paths = RunPaths::new(out_dir, &meta.run_id);
    fs::create_dir_all(&paths.dir)
        .with_context(|| format!("create run dir {}", paths.dir.display()))?;

    let mut buf = serde_json::to_string_pretty(meta)?;
    buf.push('\n');
    fs::write(&paths.meta_path, buf)
        .with_context(|| format!("write {}", paths.meta_path.display()))?;
    write_snapshot(&paths.roadmap_path, snapshot)?;

    Ok(paths)
}
