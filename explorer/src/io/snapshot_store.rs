//! Roadmap snapshot load/save with schema + invariant validation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde_json::Value;

use crate::core::graph::RoadmapGraph;
use crate::core::snapshot::GraphSnapshot;

/// JSON schema every persisted snapshot must satisfy.
pub const ROADMAP_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/roadmap/v1.schema.json"
));

/// Load a snapshot from disk and rebuild the roadmap it describes.
pub fn load_snapshot(path: &Path) -> Result<RoadmapGraph> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read snapshot {}", path.display()))?;
    parse_snapshot(&contents).with_context(|| format!("load snapshot {}", path.display()))
}

/// Parse, schema-check, and rebuild a roadmap from snapshot JSON.
pub fn parse_snapshot(contents: &str) -> Result<RoadmapGraph> {
    let value: Value = serde_json::from_str(contents).context("parse snapshot json")?;
    validate_schema(&value)?;
    let snapshot: GraphSnapshot =
        serde_json::from_value(value).context("deserialize snapshot")?;
    Ok(RoadmapGraph::from_snapshot(&snapshot)?)
}

/// Write a snapshot with stable formatting (nodes and edges sorted by id).
pub fn write_snapshot(path: &Path, snapshot: &GraphSnapshot) -> Result<()> {
    let mut sorted = snapshot.clone();
    sorted.nodes.sort_by_key(|node| node.id);
    sorted.edges.sort_by_key(|edge| edge.id);
    sorted.agents.sort_by(|a, b| a.agent.cmp(&b.agent));
    let mut buf = serde_json::to_string_pretty(&sorted)?;
    buf.push('\n');
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    fs::write(path, buf).with_context(|| format!("write snapshot {}", path.display()))
}

fn validate_schema(snapshot: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(ROADMAP_SCHEMA).context("parse roadmap schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(snapshot) {
        let messages = compiled
            .iter_errors(snapshot)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "snapshot schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::{Position, Quantizer};
    use crate::core::types::AgentId;

    fn sample_graph() -> RoadmapGraph {
        let mut g = RoadmapGraph::new(Position::new(0.0, 0.0), Quantizer::new(0.5));
        let w = g
            .add_waypoint(Position::new(1.0, 0.0), RoadmapGraph::SEED)
            .expect("waypoint");
        g.add_frontier(Position::new(2.0, 0.0), w).expect("frontier");
        g.add_world_object(Position::new(1.0, 1.0), "door")
            .expect("object");
        g.register_agent(AgentId::new("a"), w).expect("agent");
        g
    }

    /// Verifies write → load round-trip preserves ids, counters, and agents.
    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("roadmap.json");
        let graph = sample_graph();
        write_snapshot(&path, &graph.snapshot()).expect("write");

        let loaded = load_snapshot(&path).expect("load");
        assert_eq!(loaded.snapshot(), graph.snapshot());
        assert_eq!(loaded.quantizer().resolution(), 0.5);
    }

    #[test]
    fn schema_rejects_unknown_node_type() {
        let mut value = serde_json::to_value(sample_graph().snapshot()).expect("to value");
        value["nodes"][0]["type"] = Value::String("teleporter".to_string());
        let err = parse_snapshot(&value.to_string()).expect_err("schema failure");
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn invariant_violations_are_reported() {
        let mut snapshot = sample_graph().snapshot();
        // Point the frontier at a node that does not exist.
        for node in &mut snapshot.nodes {
            if let crate::core::types::NodeKind::Frontier { parent } = &mut node.kind {
                *parent = crate::core::types::NodeId(99);
            }
        }
        snapshot.edges.retain(|edge| edge.kind != crate::core::types::EdgeKind::Frontier);
        let json = serde_json::to_string(&snapshot).expect("json");
        let err = parse_snapshot(&json).expect_err("invariants");
        assert!(format!("{err:#}").contains("roadmap invariants failed"));
    }
}
