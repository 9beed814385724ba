//! Mission configuration stored under `.explorer/config.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::allocator::AllocationStrategy;
use crate::core::position::DEFAULT_RESOLUTION;
use crate::core::tasks::{DEFAULT_EXPLORE_REWARD, DEFAULT_INSPECT_REWARD, ObjectiveCatalog};
use crate::core::types::{AgentId, Capability, CapabilitySet};

/// Mission configuration (TOML).
///
/// Missing fields default, so an empty file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MissionConfig {
    /// Grid size in meters used to decide whether two positions are the same place.
    pub position_resolution: f64,

    /// Upper bound on loop iterations per agent.
    pub max_iterations: u32,

    /// Failed plans or moves toward one target before it is abandoned.
    pub max_attempts_per_target: u32,

    /// Sleep between iterations while every eligible task is claimed elsewhere.
    pub idle_backoff_ms: u64,

    pub allocation: AllocationConfig,
    pub agent: AgentConfig,
    pub objectives: ObjectivesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AllocationConfig {
    pub strategy: AllocationStrategy,
    /// Seed for `uniform-random`. Agent `i` of a fleet uses `seed + i`.
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent id. Fleets append `-<index>`.
    pub id: String,
    pub capabilities: Vec<Capability>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObjectivesConfig {
    pub explore_reward: f64,
    pub inspect_reward: f64,
    /// Per-label inspection rewards overriding `inspect_reward`.
    pub labels: BTreeMap<String, f64>,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            position_resolution: DEFAULT_RESOLUTION,
            max_iterations: 10_000,
            max_attempts_per_target: 3,
            idle_backoff_ms: 10,
            allocation: AllocationConfig::default(),
            agent: AgentConfig::default(),
            objectives: ObjectivesConfig::default(),
        }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            strategy: AllocationStrategy::RewardPerCost,
            seed: 0,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            id: "agent-0".to_string(),
            capabilities: Capability::ALL.to_vec(),
        }
    }
}

impl Default for ObjectivesConfig {
    fn default() -> Self {
        Self {
            explore_reward: DEFAULT_EXPLORE_REWARD,
            inspect_reward: DEFAULT_INSPECT_REWARD,
            labels: BTreeMap::new(),
        }
    }
}

impl MissionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.position_resolution.is_finite() && self.position_resolution > 0.0) {
            return Err(anyhow!("position_resolution must be > 0"));
        }
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        if self.max_attempts_per_target == 0 {
            return Err(anyhow!("max_attempts_per_target must be > 0"));
        }
        if self.agent.id.trim().is_empty() {
            return Err(anyhow!("agent.id must be non-empty"));
        }
        if self.agent.capabilities.is_empty() {
            return Err(anyhow!("agent.capabilities must be a non-empty array"));
        }
        let rewards = [
            ("objectives.explore_reward", self.objectives.explore_reward),
            ("objectives.inspect_reward", self.objectives.inspect_reward),
        ];
        for (name, reward) in rewards {
            if !(reward.is_finite() && reward >= 0.0) {
                return Err(anyhow!("{name} must be a finite value >= 0"));
            }
        }
        for (label, reward) in &self.objectives.labels {
            if !(reward.is_finite() && *reward >= 0.0) {
                return Err(anyhow!(
                    "objectives.labels.{label} must be a finite value >= 0"
                ));
            }
        }
        Ok(())
    }

    pub fn capabilities(&self) -> CapabilitySet {
        self.agent.capabilities.iter().copied().collect()
    }

    /// Id of fleet member `index` out of `fleet_size`.
    pub fn agent_id(&self, index: usize, fleet_size: usize) -> AgentId {
        if fleet_size <= 1 {
            AgentId::new(self.agent.id.clone())
        } else {
            AgentId::new(format!("{}-{index}", self.agent.id))
        }
    }
}

impl ObjectivesConfig {
    pub fn catalog(&self) -> ObjectiveCatalog {
        self.labels.iter().fold(
            ObjectiveCatalog::new(self.explore_reward, self.inspect_reward),
            |catalog, (label, reward)| catalog.with_label(label, *reward),
        )
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `MissionConfig::default()`.
pub fn load_config(path: &Path) -> Result<MissionConfig> {
    if !path.exists() {
        let cfg = MissionConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: MissionConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &MissionConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
