//! Initialization helpers for `.explorer/` scaffolding.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::io::config::{MissionConfig, write_config};
use crate::io::snapshot_store::ROADMAP_SCHEMA;

/// Starter world: a walled room with a side corridor and one object.
pub const SAMPLE_WORLD: &str = concat!(
    "# '.' free, '#' wall, 'S' start, '~' hazard\n",
    "resolution = 1.0\n",
    "sensor_range = 1\n",
    "rows = [\n",
    "  \"#########\",\n",
    "  \"#S.....##\",\n",
    "  \"#.##.#..#\",\n",
    "  \"#....#~.#\",\n",
    "  \"#########\",\n",
    "]\n",
    "\n",
    "[[objects]]\n",
    "cell = [4, 3]\n",
    "label = \"fiducial\"\n",
);

/// Canonical paths within `.explorer/` for a project root.
#[derive(Debug, Clone)]
pub struct ExplorerPaths {
    pub root: PathBuf,
    pub explorer_dir: PathBuf,
    pub config_path: PathBuf,
    pub world_path: PathBuf,
    pub schema_path: PathBuf,
    pub runs_dir: PathBuf,
}

impl ExplorerPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let explorer_dir = root.join(".explorer");
        Self {
            root,
            config_path: explorer_dir.join("config.toml"),
            world_path: explorer_dir.join("world.toml"),
            schema_path: explorer_dir.join("roadmap.schema.json"),
            runs_dir: explorer_dir.join("runs"),
            explorer_dir,
        }
    }
}

/// Options for `init_explorer`.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// If true, overwrite existing explorer-owned files.
    pub force: bool,
}

/// Create `.explorer/` scaffolding in `root`.
///
/// Fails if `.explorer/` already exists unless `options.force` is set.
pub fn init_explorer(root: &Path, options: &InitOptions) -> Result<ExplorerPaths> {
    let paths = ExplorerPaths::new(root);
    if paths.explorer_dir.exists() && !paths.explorer_dir.is_dir() {
        return Err(anyhow!(
            "explorer init: .explorer exists but is not a directory"
        ));
    }
    if paths.explorer_dir.exists() && !options.force {
        return Err(anyhow!(
            "explorer init: .explorer already exists (use --force to overwrite)"
        ));
    }

    fs::create_dir_all(&paths.runs_dir)
        .with_context(|| format!("create directory {}", paths.runs_dir.display()))?;
    write_config(&paths.config_path, &MissionConfig::default())?;
    write_file(&paths.world_path, SAMPLE_WORLD)?;
    write_file(&paths.schema_path, ROADMAP_SCHEMA)?;

    Ok(paths)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::Position;
    use crate::io::config::load_config;
    use crate::io::sim::GridWorld;

    #[test]
    fn init_writes_loadable_scaffolding() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = init_explorer(temp.path(), &InitOptions { force: false }).expect("init");

        assert!(paths.runs_dir.is_dir());
        assert_eq!(
            load_config(&paths.config_path).expect("config"),
            MissionConfig::default()
        );
        GridWorld::load(&paths.world_path).expect("world");
        assert!(paths.schema_path.is_file());
    }

    #[test]
    fn sample_world_keeps_its_layout() {
        let world = GridWorld::parse(SAMPLE_WORLD).expect("sample world");
        assert_eq!(world.start_position(), Position::new(1.0, 1.0));
        assert_eq!(world.reachable_cells(), 15);
        assert!(SAMPLE_WORLD.contains("\"#########\""));
    }

    #[test]
    fn init_refuses_to_overwrite_without_force() {
        let temp = tempfile::tempdir().expect("tempdir");
        init_explorer(temp.path(), &InitOptions { force: false }).expect("first init");
        let err = init_explorer(temp.path(), &InitOptions { force: false })
            .expect_err("second init");
        assert!(err.to_string().contains("--force"));
        init_explorer(temp.path(), &InitOptions { force: true }).expect("forced init");
    }
}
