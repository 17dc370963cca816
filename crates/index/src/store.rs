use anyhow::Result;
use async_trait::async_trait;
use extract::ExtractionResult;
use serde::Serialize;
use serde_json::{Map, Value};

/// Field name -> value, one per result row of a raw query.
pub type QueryRow = Map<String, Value>;

/// Idempotent graph persistence.
///
/// Entities are keyed by name and relations by (source, target, type).
/// Re-applying an upsert with the same arguments changes nothing, and a
/// relation whose endpoints are not stored is skipped without error.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Short backend label for logs and health output.
    fn backend(&self) -> &'static str;

    async fn init_schema(&self) -> Result<()>;

    async fn ping(&self) -> Result<()>;

    async fn upsert_entity(
        &self,
        name: &str,
        entity_type: &str,
        description: Option<&str>,
    ) -> Result<()>;

    async fn upsert_relation(
        &self,
        source: &str,
        target: &str,
        relation_type: &str,
        description: Option<&str>,
    ) -> Result<()>;

    /// Run a query in the store's native language.
    async fn query(&self, query: &str, params: Map<String, Value>) -> Result<Vec<QueryRow>>;

    async fn export_graph(&self) -> Result<ExtractionResult>;

    async fn clear(&self) -> Result<()>;

    /// Relations touching `name`, in either direction, at most `limit`.
    async fn neighborhood(&self, name: &str, limit: usize) -> Result<Vec<Neighbor>>;

    async fn stats(&self) -> Result<GraphStats>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub entity: String,
    pub relation: String,
    pub neighbor: String,
    pub neighbor_description: Option<String>,
    /// true when the edge points from `entity` to `neighbor`
    pub outgoing: bool,
}

impl Neighbor {
    /// One line of chat context, e.g. `Elon Musk CEO_OF SpaceX (rocket maker)`
    pub fn describe(&self) -> String {
        let mut line = if self.outgoing {
            format!("{} {} {}", self.entity, self.relation, self.neighbor)
        } else {
            format!("{} {} {}", self.neighbor, self.relation, self.entity)
        };
        if let Some(description) = self.neighbor_description.as_deref().filter(|d| !d.is_empty()) {
            line.push_str(&format!(" ({})", description));
        }
        line
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub entity_count: usize,
    pub relation_count: usize,
}
