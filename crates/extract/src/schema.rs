use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ExtractionError;

/// A graph node, keyed by `name` within one result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A directed, typed edge between two entity names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Relation {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation_type: relation_type.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Deduplication key: (source, target, type)
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.source, &self.target, &self.relation_type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl ExtractionResult {
    pub fn new(entities: Vec<Entity>, relations: Vec<Relation>) -> Self {
        Self { entities, relations }
    }

    /// Parse an LLM payload, rejecting anything that does not fit the
    /// Entity/Relation schema.
    pub fn parse(json: &str) -> Result<Self, ExtractionError> {
        let result: ExtractionResult =
            serde_json::from_str(json).map_err(|e| ExtractionError::Schema(e.to_string()))?;
        result.check_schema()?;
        Ok(result)
    }

    fn check_schema(&self) -> Result<(), ExtractionError> {
        for (i, entity) in self.entities.iter().enumerate() {
            if entity.name.trim().is_empty() {
                return Err(ExtractionError::Schema(format!("entities[{}].name is empty", i)));
            }
            if entity.entity_type.trim().is_empty() {
                return Err(ExtractionError::Schema(format!("entities[{}].type is empty", i)));
            }
        }
        for (i, relation) in self.relations.iter().enumerate() {
            let fields = [
                ("source", &relation.source),
                ("target", &relation.target),
                ("type", &relation.relation_type),
            ];
            for (field, value) in fields {
                if value.trim().is_empty() {
                    return Err(ExtractionError::Schema(format!(
                        "relations[{}].{} is empty",
                        i, field
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn entity_names(&self) -> HashSet<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedChunk {
    pub chunk_index: usize,
    pub chunk_id: String,
    pub doc_id: String,
    pub extraction: ExtractionResult,
}
