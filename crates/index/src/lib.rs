pub mod memory;
pub mod neo4j_index;
pub mod store;

pub use memory::MemoryGraphStore;
pub use neo4j_index::Neo4jStore;
pub use store::{GraphStats, GraphStore, Neighbor, QueryRow};

use anyhow::Result;
use extract::ExtractionResult;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    pub entities_upserted: usize,
    pub relations_upserted: usize,
}

/// Write a graph through the upsert contract: every entity first, then every
/// relation, so edge endpoints already exist when edges are merged.
pub async fn persist_graph(store: &dyn GraphStore, graph: &ExtractionResult) -> Result<PersistSummary> {
    for entity in &graph.entities {
        store
            .upsert_entity(&entity.name, &entity.entity_type, entity.description.as_deref())
            .await?;
    }

    for relation in &graph.relations {
        store
            .upsert_relation(
                &relation.source,
                &relation.target,
                &relation.relation_type,
                relation.description.as_deref(),
            )
            .await?;
    }

    debug!(
        backend = store.backend(),
        entities = graph.entities.len(),
        relations = graph.relations.len(),
        "Graph persisted"
    );

    Ok(PersistSummary {
        entities_upserted: graph.entities.len(),
        relations_upserted: graph.relations.len(),
    })
}
