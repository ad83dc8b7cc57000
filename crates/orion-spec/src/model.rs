use crate::scheme::NormalizationScheme;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum GraphSpecError {
    #[error("graph spec missing required field: {0}")]
    MissingField(String),
    #[error("no sources or subgraphs were provided for graph {0}")]
    NoSources(String),
    #[error("invalid YAML in graph spec: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("cyclic subgraph dependency detected involving graph {0}")]
    Cycle(String),
    #[error("subgraph {subgraph_id} requested by {graph_id} has no graph spec entry")]
    UnknownSubgraph { graph_id: String, subgraph_id: String },
}

/// A declarative reference to another graph this graph is assembled from
/// (`spec.md` §3's SubGraphSource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubGraphSource {
    pub graph_id: String,
    /// Pin to a specific prior build of the subgraph; `None` means "build it
    /// fresh to match the version this graph spec currently implies".
    pub graph_version: Option<String>,
    pub merge_strategy: Option<String>,
}

/// A single upstream data source contributing to a graph, with its own
/// normalization scheme (`spec.md` §3's DataSource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub source_id: String,
    pub source_version: Option<String>,
    pub parsing_version: Option<String>,
    pub merge_strategy: Option<String>,
    #[serde(default)]
    pub normalization_scheme: NormalizationScheme,
    #[serde(default)]
    pub edge_merging_attributes: Vec<String>,
    #[serde(default)]
    pub edge_id_addition: bool,
    /// Too large to dedup entirely in memory; forces `DiskMerger` for the
    /// whole graph build even if no other source requests it (`spec.md`
    /// §4.7's merger-selection rule).
    #[serde(default)]
    pub resource_hog: bool,
}

/// A single `graphs[]` entry in a GraphSpec YAML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEntry {
    pub graph_id: String,
    #[serde(default)]
    pub graph_name: String,
    #[serde(default)]
    pub graph_description: String,
    #[serde(default)]
    pub graph_url: String,
    #[serde(default)]
    pub output_format: Vec<String>,
    #[serde(default)]
    pub sources: Vec<DataSource>,
    #[serde(default)]
    pub subgraphs: Vec<SubGraphSource>,

    // graph-wide overrides, applied onto every source at parse time
    pub node_normalization_version: Option<String>,
    pub edge_normalization_version: Option<String>,
    pub conflation: Option<bool>,
    pub strict_normalization: Option<bool>,
    pub edge_merging_attributes: Option<Vec<String>>,
    pub edge_id_addition: Option<bool>,
    /// Explicit operator override forcing `DiskMerger` for this graph
    /// regardless of any source's `resource_hog` flag (`spec.md` §4.7).
    #[serde(default)]
    pub save_memory: bool,
}

impl GraphEntry {
    fn validate(&self) -> Result<(), GraphSpecError> {
        if self.sources.is_empty() && self.subgraphs.is_empty() {
            return Err(GraphSpecError::NoSources(self.graph_id.clone()));
        }
        Ok(())
    }

    /// Applies graph-wide normalization overrides onto every direct source,
    /// matching `orion/build_manager.py`'s `parse_graph_spec`: graph-level
    /// settings win over whatever a source specified individually.
    fn apply_overrides(&mut self) {
        for source in &mut self.sources {
            if let Some(v) = &self.node_normalization_version {
                source.normalization_scheme.node_normalization_version = v.clone();
            }
            if let Some(v) = &self.edge_normalization_version {
                source.normalization_scheme.edge_normalization_version = v.clone();
            }
            if let Some(v) = self.conflation {
                source.normalization_scheme.conflation = v;
            }
            if let Some(v) = self.strict_normalization {
                source.normalization_scheme.strict = v;
            }
            let dont_merge = source.merge_strategy.as_deref() == Some("none");
            if !dont_merge {
                if let Some(attrs) = &self.edge_merging_attributes {
                    source.edge_merging_attributes = attrs.clone();
                }
                if let Some(v) = self.edge_id_addition {
                    source.edge_id_addition = v;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GraphSpecDocument {
    graphs: Vec<GraphEntry>,
}

/// The full set of graph specs loaded from one or more YAML documents,
/// keyed by `graph_id`, per `spec.md` §6's GraphSpec description.
#[derive(Debug, Clone, Default)]
pub struct GraphSpecSet {
    graphs: BTreeMap<String, GraphEntry>,
}

impl GraphSpecSet {
    pub fn parse_yaml(yaml: &str) -> Result<Self, GraphSpecError> {
        let doc: GraphSpecDocument = serde_yaml::from_str(yaml)?;
        let mut graphs = BTreeMap::new();
        for mut entry in doc.graphs {
            entry.validate()?;
            entry.apply_overrides();
            graphs.insert(entry.graph_id.clone(), entry);
        }
        Ok(GraphSpecSet { graphs })
    }

    pub fn get(&self, graph_id: &str) -> Option<&GraphEntry> {
        self.graphs.get(graph_id)
    }

    pub fn graph_ids(&self) -> impl Iterator<Item = &str> {
        self.graphs.keys().map(String::as_str)
    }

    /// Topologically orders `graph_id` and everything it transitively depends
    /// on via `subgraphs`, dependencies first, detecting cycles along the way
    /// (Kahn's algorithm, per `spec.md` §9's REDESIGN FLAG on explicit cycle
    /// detection rather than the teacher's unbounded recursion).
    pub fn build_order(&self, graph_id: &str) -> Result<Vec<String>, GraphSpecError> {
        let mut visiting = Vec::new();
        let mut visited = std::collections::HashSet::new();
        let mut order = Vec::new();
        self.visit(graph_id, &mut visiting, &mut visited, &mut order)?;
        Ok(order)
    }

    fn visit(
        &self,
        graph_id: &str,
        visiting: &mut Vec<String>,
        visited: &mut std::collections::HashSet<String>,
        order: &mut Vec<String>,
    ) -> Result<(), GraphSpecError> {
        if visited.contains(graph_id) {
            return Ok(());
        }
        if visiting.contains(&graph_id.to_string()) {
            return Err(GraphSpecError::Cycle(graph_id.to_string()));
        }
        let entry = self.graphs.get(graph_id).ok_or_else(|| {
            GraphSpecError::UnknownSubgraph {
                graph_id: visiting.last().cloned().unwrap_or_default(),
                subgraph_id: graph_id.to_string(),
            }
        })?;
        visiting.push(graph_id.to_string());
        for sub in &entry.subgraphs {
            self.visit(&sub.graph_id, visiting, visited, order)?;
        }
        visiting.pop();
        visited.insert(graph_id.to_string());
        order.push(graph_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = r#"
graphs:
  - graph_id: my-graph
    sources:
      - source_id: CTD
        source_version: "1.0"
"#;

    #[test]
    fn parses_minimal_graph() {
        let spec = GraphSpecSet::parse_yaml(SIMPLE).unwrap();
        let graph = spec.get("my-graph").unwrap();
        assert_eq!(graph.sources.len(), 1);
        assert_eq!(graph.sources[0].source_id, "CTD");
    }

    #[test]
    fn missing_sources_and_subgraphs_is_rejected() {
        let yaml = "graphs:\n  - graph_id: empty\n";
        assert!(GraphSpecSet::parse_yaml(yaml).is_err());
    }

    #[test]
    fn graph_wide_overrides_win_over_source_settings() {
        let yaml = r#"
graphs:
  - graph_id: g
    strict_normalization: false
    sources:
      - source_id: CTD
        normalization_scheme:
          strict: true
"#;
        let spec = GraphSpecSet::parse_yaml(yaml).unwrap();
        let graph = spec.get("g").unwrap();
        assert!(!graph.sources[0].normalization_scheme.strict);
    }

    #[test]
    fn build_order_resolves_subgraph_dependencies_first() {
        let yaml = r#"
graphs:
  - graph_id: base
    sources:
      - source_id: CTD
  - graph_id: composed
    subgraphs:
      - graph_id: base
"#;
        let spec = GraphSpecSet::parse_yaml(yaml).unwrap();
        let order = spec.build_order("composed").unwrap();
        assert_eq!(order, vec!["base".to_string(), "composed".to_string()]);
    }

    #[test]
    fn build_order_detects_cycles() {
        let yaml = r#"
graphs:
  - graph_id: a
    subgraphs:
      - graph_id: b
  - graph_id: b
    subgraphs:
      - graph_id: a
"#;
        let spec = GraphSpecSet::parse_yaml(yaml).unwrap();
        assert!(spec.build_order("a").is_err());
    }

    #[test]
    fn build_order_reports_unknown_subgraph() {
        let yaml = r#"
graphs:
  - graph_id: a
    subgraphs:
      - graph_id: missing
"#;
        let spec = GraphSpecSet::parse_yaml(yaml).unwrap();
        assert!(spec.build_order("a").is_err());
    }
}
