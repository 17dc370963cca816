use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ShapeError;
use crate::triples::{ENTITY_CLASS, NAME_PROPERTY, TYPE_PROPERTY};

/// Externally supplied structural rules, read from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeSet {
    #[serde(default)]
    pub node_shapes: Vec<NodeShape>,
    #[serde(default)]
    pub edge_shapes: Vec<EdgeShape>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeShape {
    pub name: String,
    pub target_class: String,
    #[serde(default)]
    pub properties: Vec<PropertyShape>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyShape {
    pub path: String,
    #[serde(default)]
    pub min_count: Option<usize>,
    #[serde(default)]
    pub max_count: Option<usize>,
    #[serde(default)]
    pub node_kind: Option<NodeKind>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default, rename = "in")]
    pub allowed: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Literal,
    Iri,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeShape {
    pub name: String,
    /// Only edges with this label; every edge when absent
    #[serde(default)]
    pub edge_type: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub source_class: Option<String>,
    #[serde(default)]
    pub target_class: Option<String>,
}

impl Default for ShapeSet {
    fn default() -> Self {
        let required_literal = |path: &str| PropertyShape {
            path: path.to_string(),
            min_count: Some(1),
            max_count: Some(1),
            node_kind: Some(NodeKind::Literal),
            min_length: Some(1),
            ..Default::default()
        };

        Self {
            node_shapes: vec![NodeShape {
                name: "EntityShape".to_string(),
                target_class: ENTITY_CLASS.to_string(),
                properties: vec![required_literal(NAME_PROPERTY), required_literal(TYPE_PROPERTY)],
            }],
            edge_shapes: vec![
                EdgeShape {
                    name: "RelationEndpointShape".to_string(),
                    source_class: Some(ENTITY_CLASS.to_string()),
                    target_class: Some(ENTITY_CLASS.to_string()),
                    ..Default::default()
                },
                EdgeShape {
                    name: "RelationLabelShape".to_string(),
                    pattern: Some("^[A-Za-z][A-Za-z0-9_]*$".to_string()),
                    ..Default::default()
                },
            ],
        }
    }
}

impl ShapeSet {
    pub fn from_toml_str(s: &str) -> Result<Self, ShapeError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, ShapeError> {
        let content = std::fs::read_to_string(path).map_err(|source| ShapeError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn rule_count(&self) -> usize {
        self.node_shapes.iter().map(|s| s.properties.len()).sum::<usize>() + self.edge_shapes.len()
    }
}
