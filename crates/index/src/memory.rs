use std::collections::HashMap;

use anyhow::{Result, bail};
use async_trait::async_trait;
use extract::{Entity, ExtractionResult, Relation};
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::store::{GraphStats, GraphStore, Neighbor, QueryRow};

#[derive(Default)]
struct MemoryGraph {
    entities: Vec<Entity>,
    entity_to_idx: HashMap<String, usize>,
    relations: Vec<Relation>,
    relation_to_idx: HashMap<(String, String, String), usize>,
}

/// Process-local graph store with the same upsert semantics as Neo4j.
/// Used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryGraphStore {
    graph: RwLock<MemoryGraph>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn init_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert_entity(
        &self,
        name: &str,
        entity_type: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let mut graph = self.graph.write().await;

        if let Some(&idx) = graph.entity_to_idx.get(name) {
            let entity = &mut graph.entities[idx];
            entity.entity_type = entity_type.to_string();
            entity.description = description.map(str::to_string);
            return Ok(());
        }

        let idx = graph.entities.len();
        graph.entities.push(Entity {
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            description: description.map(str::to_string),
        });
        graph.entity_to_idx.insert(name.to_string(), idx);
        Ok(())
    }

    async fn upsert_relation(
        &self,
        source: &str,
        target: &str,
        relation_type: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let mut graph = self.graph.write().await;

        if !graph.entity_to_idx.contains_key(source) || !graph.entity_to_idx.contains_key(target) {
            return Ok(());
        }

        let key = (source.to_string(), target.to_string(), relation_type.to_string());
        if let Some(&idx) = graph.relation_to_idx.get(&key) {
            graph.relations[idx].description = description.map(str::to_string);
            return Ok(());
        }

        let idx = graph.relations.len();
        graph.relations.push(Relation {
            source: key.0.clone(),
            target: key.1.clone(),
            relation_type: key.2.clone(),
            description: description.map(str::to_string),
        });
        graph.relation_to_idx.insert(key, idx);
        Ok(())
    }

    async fn query(&self, _query: &str, _params: Map<String, Value>) -> Result<Vec<QueryRow>> {
        bail!("Raw queries need a Neo4j backend; the in-memory store has no query engine")
    }

    async fn export_graph(&self) -> Result<ExtractionResult> {
        let graph = self.graph.read().await;
        Ok(ExtractionResult::new(graph.entities.clone(), graph.relations.clone()))
    }

    async fn clear(&self) -> Result<()> {
        *self.graph.write().await = MemoryGraph::default();
        Ok(())
    }

    async fn neighborhood(&self, name: &str, limit: usize) -> Result<Vec<Neighbor>> {
        let graph = self.graph.read().await;
        let description_of = |n: &str| {
            graph
                .entity_to_idx
                .get(n)
                .and_then(|&idx| graph.entities[idx].description.clone())
        };

        let neighbors = graph
            .relations
            .iter()
            .filter(|r| r.source == name || r.target == name)
            .take(limit)
            .map(|r| {
                let outgoing = r.source == name;
                let other = if outgoing { &r.target } else { &r.source };
                Neighbor {
                    entity: name.to_string(),
                    relation: r.relation_type.clone(),
                    neighbor: other.clone(),
                    neighbor_description: description_of(other),
                    outgoing,
                }
            })
            .collect();

        Ok(neighbors)
    }

    async fn stats(&self) -> Result<GraphStats> {
        let graph = self.graph.read().await;
        Ok(GraphStats {
            entity_count: graph.entities.len(),
            relation_count: graph.relations.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entity_upsert_updates_in_place() {
        let store = MemoryGraphStore::new();
        store.upsert_entity("Tesla", "ORG", None).await.unwrap();
        store.upsert_entity("Tesla", "COMPANY", Some("EV maker")).await.unwrap();

        let graph = store.export_graph().await.unwrap();
        assert_eq!(graph.entities.len(), 1);
        assert_eq!(graph.entities[0].entity_type, "COMPANY");
        assert_eq!(graph.entities[0].description.as_deref(), Some("EV maker"));
    }

    #[tokio::test]
    async fn test_relation_with_missing_endpoint_is_skipped() {
        let store = MemoryGraphStore::new();
        store.upsert_entity("SpaceX", "ORG", None).await.unwrap();

        store
            .upsert_relation("SpaceX", "Hawthorne", "LOCATED_IN", None)
            .await
            .unwrap();

        assert_eq!(store.stats().await.unwrap().relation_count, 0);
    }

    #[tokio::test]
    async fn test_neighborhood_and_clear() {
        let store = MemoryGraphStore::new();
        store.upsert_entity("Elon Musk", "PERSON", None).await.unwrap();
        store.upsert_entity("SpaceX", "ORG", Some("rocket maker")).await.unwrap();
        store.upsert_entity("Tesla", "ORG", None).await.unwrap();
        store.upsert_relation("Elon Musk", "SpaceX", "CEO_OF", None).await.unwrap();
        store.upsert_relation("Elon Musk", "Tesla", "CEO_OF", None).await.unwrap();

        let around_spacex = store.neighborhood("SpaceX", 10).await.unwrap();
        assert_eq!(around_spacex.len(), 1);
        assert!(!around_spacex[0].outgoing);
        assert_eq!(around_spacex[0].describe(), "Elon Musk CEO_OF SpaceX");

        let around_musk = store.neighborhood("Elon Musk", 1).await.unwrap();
        assert_eq!(around_musk.len(), 1);
        assert_eq!(around_musk[0].describe(), "Elon Musk CEO_OF SpaceX (rocket maker)");

        store.clear().await.unwrap();
        assert_eq!(
            store.stats().await.unwrap(),
            GraphStats { entity_count: 0, relation_count: 0 }
        );
    }

    #[tokio::test]
    async fn test_raw_query_is_unsupported() {
        let store = MemoryGraphStore::new();
        assert!(store.query("MATCH (n) RETURN n", Map::new()).await.is_err());
    }
}
