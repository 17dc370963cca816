use anyhow::{Context, Result};
use async_trait::async_trait;
use extract::{Entity, ExtractionResult, Relation};
use neo4rs::{BoltList, BoltMap, BoltNull, BoltString, BoltType, Graph, Query};
use serde_json::{Map, Value};
use tracing::info;

use crate::store::{GraphStats, GraphStore, Neighbor, QueryRow};

pub struct Neo4jStore {
    graph: Graph,
}

impl Neo4jStore {
    pub fn new(graph: Graph) -> Self {
        Self { graph }
    }

    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self> {
        let graph = Graph::new(uri, user, password)
            .await
            .with_context(|| format!("Failed to connect to Neo4j at {}", uri))?;
        Ok(Self::new(graph))
    }

    async fn count(&self, cypher: &str) -> Result<usize> {
        let mut result = self.graph.execute(Query::new(cypher.to_string())).await?;
        let count = if let Some(row) = result.next().await? {
            row.get::<i64>("count").unwrap_or(0) as usize
        } else {
            0
        };
        Ok(count)
    }
}

fn optional_text(value: Option<&str>) -> BoltType {
    match value {
        Some(text) => BoltType::from(text),
        None => BoltType::Null(BoltNull),
    }
}

/// Convert a JSON query parameter into its Bolt equivalent.
pub fn json_to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => BoltType::from(i),
            None => BoltType::from(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => BoltType::from(s.as_str()),
        Value::Array(items) => {
            let mut list = BoltList::new();
            for item in items {
                list.push(json_to_bolt(item));
            }
            BoltType::List(list)
        }
        Value::Object(fields) => {
            let mut map = BoltMap::new();
            for (key, item) in fields {
                map.put(BoltString::from(key.as_str()), json_to_bolt(item));
            }
            BoltType::Map(map)
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jStore {
    fn backend(&self) -> &'static str {
        "neo4j"
    }

    /// Initialize schema: entity names are unique
    async fn init_schema(&self) -> Result<()> {
        let query = Query::new(
            "CREATE CONSTRAINT entity_name_unique IF NOT EXISTS FOR (e:Entity) REQUIRE e.name IS UNIQUE".to_string()
        );
        self.graph.run(query).await
            .context("Failed to create uniqueness constraint on Entity.name")?;

        info!("Neo4j schema ready");
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.graph.run(Query::new("RETURN 1".to_string())).await
            .context("Neo4j did not answer")?;
        Ok(())
    }

    /// MERGE by name, then overwrite type and description
    async fn upsert_entity(
        &self,
        name: &str,
        entity_type: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let query = Query::new(
            r#"
            MERGE (e:Entity {name: $name})
            SET e.type = $type,
                e.description = $description
            "#.to_string()
        )
        .param("name", name)
        .param("type", entity_type)
        .param("description", optional_text(description));

        self.graph.run(query).await
            .with_context(|| format!("Failed to upsert entity {:?}", name))?;

        Ok(())
    }

    /// MATCH both endpoints first; when either is missing the MERGE never runs
    async fn upsert_relation(
        &self,
        source: &str,
        target: &str,
        relation_type: &str,
        description: Option<&str>,
    ) -> Result<()> {
        let query = Query::new(
            r#"
            MATCH (source:Entity {name: $source})
            MATCH (target:Entity {name: $target})
            MERGE (source)-[r:RELATION {type: $type}]->(target)
            SET r.description = $description
            "#.to_string()
        )
        .param("source", source)
        .param("target", target)
        .param("type", relation_type)
        .param("description", optional_text(description));

        self.graph.run(query).await
            .with_context(|| format!("Failed to upsert relation {} -[{}]-> {}", source, relation_type, target))?;

        Ok(())
    }

    async fn query(&self, cypher: &str, params: Map<String, Value>) -> Result<Vec<QueryRow>> {
        let mut query = Query::new(cypher.to_string());
        for (key, value) in &params {
            query = query.param(key, json_to_bolt(value));
        }

        let mut result = self.graph.execute(query).await
            .context("Query failed")?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            let fields: QueryRow = row.to().context("Failed to decode query row")?;
            rows.push(fields);
        }

        Ok(rows)
    }

    async fn export_graph(&self) -> Result<ExtractionResult> {
        let mut exported = ExtractionResult::default();

        let query = Query::new(
            "MATCH (e:Entity) RETURN e.name AS name, e.type AS type, e.description AS description".to_string()
        );
        let mut result = self.graph.execute(query).await
            .context("Failed to export entities from Neo4j")?;

        while let Some(row) = result.next().await? {
            exported.entities.push(Entity {
                name: row.get("name").context("Missing name")?,
                entity_type: row.get("type").unwrap_or_else(|_| "UNKNOWN".to_string()),
                description: row.get::<Option<String>>("description").unwrap_or(None),
            });
        }

        let query = Query::new(
            r#"
            MATCH (source:Entity)-[r:RELATION]->(target:Entity)
            RETURN source.name AS source, target.name AS target,
                   r.type AS type, r.description AS description
            "#.to_string()
        );
        let mut result = self.graph.execute(query).await
            .context("Failed to export relations from Neo4j")?;

        while let Some(row) = result.next().await? {
            exported.relations.push(Relation {
                source: row.get("source").context("Missing source")?,
                target: row.get("target").context("Missing target")?,
                relation_type: row.get("type").context("Missing relation type")?,
                description: row.get::<Option<String>>("description").unwrap_or(None),
            });
        }

        Ok(exported)
    }

    async fn clear(&self) -> Result<()> {
        self.graph.run(Query::new("MATCH (e:Entity) DETACH DELETE e".to_string())).await
            .context("Failed to clear graph")?;
        Ok(())
    }

    async fn neighborhood(&self, name: &str, limit: usize) -> Result<Vec<Neighbor>> {
        let query = Query::new(
            r#"
            MATCH (e:Entity {name: $name})-[r:RELATION]-(n:Entity)
            RETURN e.name AS entity, r.type AS relation, n.name AS neighbor,
                   n.description AS description, startNode(r) = e AS outgoing
            LIMIT $limit
            "#.to_string()
        )
        .param("name", name)
        .param("limit", limit as i64);

        let mut result = self.graph.execute(query).await
            .with_context(|| format!("Failed to load neighborhood of {:?}", name))?;

        let mut neighbors = Vec::new();
        while let Some(row) = result.next().await? {
            neighbors.push(Neighbor {
                entity: row.get("entity")?,
                relation: row.get("relation")?,
                neighbor: row.get("neighbor")?,
                neighbor_description: row.get::<Option<String>>("description").unwrap_or(None),
                outgoing: row.get("outgoing").unwrap_or(true),
            });
        }

        Ok(neighbors)
    }

    /// Get graph statistics
    async fn stats(&self) -> Result<GraphStats> {
        let entity_count = self.count("MATCH (e:Entity) RETURN count(e) as count").await?;
        let relation_count = self
            .count("MATCH ()-[r:RELATION]->() RETURN count(r) as count")
            .await?;

        Ok(GraphStats {
            entity_count,
            relation_count,
        })
    }
}
