//! Scenario files: domain schemas, instance lines and flow policy in one YAML document.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bt_core::EntityCategory;
use bt_runtime::{OrderType, SuccessCriteria};
use serde::{Deserialize, Serialize};

/// A runnable scenario, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Display name, also used as the root node name
    #[serde(default = "default_name")]
    pub name: String,

    /// Seconds passed to every tick
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: f32,

    /// Upper bound on ticks before the run is abandoned
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Append accepted predicates to this JSON-lines file (relative to the scenario file)
    pub persist_predicates: Option<PathBuf>,

    #[serde(default)]
    pub flow: FlowConfig,

    #[serde(default)]
    pub domain: DomainConfig,

    /// Instance definitions, one per line
    #[serde(default)]
    pub instances: String,
}

fn default_name() -> String {
    "scenario".to_string()
}
fn default_tick_seconds() -> f32 {
    0.1
}
fn default_max_ticks() -> u64 {
    1_000
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: default_name(),
            tick_seconds: default_tick_seconds(),
            max_ticks: default_max_ticks(),
            persist_predicates: None,
            flow: FlowConfig::default(),
            domain: DomainConfig::default(),
            instances: String::new(),
        }
    }
}

/// How the root flow node schedules and judges the loaded actions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default)]
    pub success_criteria: SuccessCriteria,

    /// Order type applied between consecutive actions, in instance order
    #[serde(default)]
    pub ordering: OrderType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomainConfig {
    #[serde(default)]
    pub entities: Vec<EntityDecl>,

    #[serde(default)]
    pub predicates: Vec<PredicateDecl>,

    #[serde(default)]
    pub actions: Vec<ActionDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityDecl {
    pub name: String,
    pub category: EntityCategory,

    /// Property kinds: bool, int, double or string
    #[serde(default)]
    pub properties: Vec<FieldDecl>,
}

/// A named, typed slot. Kinds are parsed when the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredicateDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDecl {
    pub name: String,

    #[serde(default)]
    pub params: Vec<FieldDecl>,

    /// Predicate templates such as `holding(agent = client, isNegated = true)`
    #[serde(default)]
    pub preconditions: Vec<String>,

    #[serde(default)]
    pub effects: Vec<String>,

    #[serde(default)]
    pub logic: LogicKind,
}

/// Built-in action behaviours available to scenario files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicKind {
    #[default]
    Succeed,
    Fail,
    /// Logs the bound entities, then succeeds
    Log,
}

impl Scenario {
    /// Load a scenario from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario from {}", path.display()))?;
        let mut scenario: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse scenario from {}", path.display()))?;
        if let Some(dir) = path.parent() {
            scenario.resolve_paths(dir);
        }
        Ok(scenario)
    }

    /// Resolve relative paths against the scenario's directory.
    pub fn resolve_paths(&mut self, base: &Path) {
        if let Some(persist) = self.persist_predicates.as_mut() {
            if persist.is_relative() {
                *persist = base.join(&*persist);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAREHOUSE: &str = r#"
name: warehouse
tick_seconds: 0.5
persist_predicates: out/predicates.jsonl
flow:
  success_criteria:
    count: 1
  ordering: total
domain:
  entities:
    - name: Robot
      category: agent
      properties:
        - { name: battery, type: double }
    - name: Box
      category: element
  predicates:
    - name: holding
      params:
        - { name: agent, type: agent }
        - { name: myObject, type: element }
  actions:
    - name: PickUp
      params:
        - { name: client, type: agent }
        - { name: obj, type: element }
      preconditions: ["holding(agent = client, myObject = obj, isNegated = true)"]
      effects: ["holding(agent = client, myObject = obj)"]
      logic: log
instances: |
  ParameterInstance: Robot {r1}
  ParameterInstance: Box {box1}
  ActionInstance: PickUp(client : r1, obj : box1)
"#;

    #[test]
    fn loads_full_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warehouse.yaml");
        std::fs::write(&path, WAREHOUSE).unwrap();

        let scenario = Scenario::load(&path).unwrap();

        assert_eq!(scenario.name, "warehouse");
        assert_eq!(scenario.tick_seconds, 0.5);
        assert_eq!(scenario.max_ticks, 1_000);
        assert_eq!(scenario.flow.success_criteria, SuccessCriteria::Count(1));
        assert_eq!(scenario.flow.ordering, OrderType::Total);
        assert_eq!(scenario.domain.entities.len(), 2);
        assert_eq!(scenario.domain.entities[0].category, EntityCategory::Agent);
        assert_eq!(scenario.domain.actions[0].logic, LogicKind::Log);
        assert_eq!(scenario.instances.lines().count(), 3);
        assert_eq!(
            scenario.persist_predicates,
            Some(dir.path().join("out/predicates.jsonl"))
        );
    }

    #[test]
    fn empty_document_uses_defaults() {
        let scenario: Scenario = serde_yaml::from_str("{}").unwrap();

        assert_eq!(scenario.name, "scenario");
        assert_eq!(scenario.tick_seconds, 0.1);
        assert_eq!(scenario.flow.success_criteria, SuccessCriteria::All);
        assert_eq!(scenario.flow.ordering, OrderType::None);
        assert!(scenario.persist_predicates.is_none());
        assert!(scenario.instances.is_empty());
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let err = Scenario::load(&path).unwrap_err();

        assert!(format!("{err}").contains("absent.yaml"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "flow: [unclosed").unwrap();

        let err = Scenario::load(&path).unwrap_err();

        assert!(format!("{err}").starts_with("Failed to parse scenario"));
    }
}
