//! Triple view of an extraction result.
//!
//! Every entity becomes a node typed `Entity` carrying `name` and `type`
//! literals; every relation becomes a direct edge labelled with its type.
//! Nodes are identified by the entity name with spaces replaced by
//! underscores.

use std::collections::BTreeMap;

use extract::ExtractionResult;

pub const ENTITY_CLASS: &str = "Entity";
pub const NAME_PROPERTY: &str = "name";
pub const TYPE_PROPERTY: &str = "type";
pub const PREFIX: &str = "kg:";

pub fn normalize_identifier(name: &str) -> String {
    name.replace(' ', "_")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Node(String),
    Literal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripleKind {
    /// `node rdf:type Class`
    Type,
    /// Literal-valued property such as `name`
    Property,
    /// Relation between two nodes
    Edge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
    pub kind: TripleKind,
}

/// Distinct entity names that normalize to one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierCollision {
    pub identifier: String,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TripleGraph {
    triples: Vec<Triple>,
    collisions: Vec<IdentifierCollision>,
}

impl TripleGraph {
    pub fn from_extraction(result: &ExtractionResult) -> Self {
        let mut graph = TripleGraph::default();
        let mut names_by_id: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for entity in &result.entities {
            let id = normalize_identifier(&entity.name);
            let names = names_by_id.entry(id.clone()).or_default();
            if !names.contains(&entity.name) {
                names.push(entity.name.clone());
            }

            graph.push(&id, "rdf:type", Term::Node(ENTITY_CLASS.to_string()), TripleKind::Type);
            graph.push(&id, NAME_PROPERTY, Term::Literal(entity.name.clone()), TripleKind::Property);
            graph.push(&id, TYPE_PROPERTY, Term::Literal(entity.entity_type.clone()), TripleKind::Property);
        }

        for relation in &result.relations {
            graph.push(
                &normalize_identifier(&relation.source),
                &relation.relation_type,
                Term::Node(normalize_identifier(&relation.target)),
                TripleKind::Edge,
            );
        }

        graph.collisions = names_by_id
            .into_iter()
            .filter(|(_, names)| names.len() > 1)
            .map(|(identifier, names)| IdentifierCollision { identifier, names })
            .collect();

        graph
    }

    fn push(&mut self, subject: &str, predicate: &str, object: Term, kind: TripleKind) {
        let triple = Triple {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object,
            kind,
        };
        // Set semantics: a repeated statement adds nothing
        if !self.triples.contains(&triple) {
            self.triples.push(triple);
        }
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn collisions(&self) -> &[IdentifierCollision] {
        &self.collisions
    }

    /// Nodes typed with `class`, in first-seen order.
    pub fn instances_of(&self, class: &str) -> Vec<&str> {
        let mut nodes: Vec<&str> = Vec::new();
        for t in &self.triples {
            if t.kind == TripleKind::Type
                && t.object == Term::Node(class.to_string())
                && !nodes.contains(&t.subject.as_str())
            {
                nodes.push(&t.subject);
            }
        }
        nodes
    }

    pub fn has_class(&self, node: &str, class: &str) -> bool {
        self.triples.iter().any(|t| {
            t.kind == TripleKind::Type && t.subject == node && t.object == Term::Node(class.to_string())
        })
    }

    /// Values of `path` on `node`, from either literal properties or edges.
    pub fn values(&self, node: &str, path: &str) -> Vec<&Term> {
        self.triples
            .iter()
            .filter(|t| t.kind != TripleKind::Type && t.subject == node && t.predicate == path)
            .map(|t| &t.object)
            .collect()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter().filter(|t| t.kind == TripleKind::Edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{Entity, Relation};

    #[test]
    fn test_entities_and_relations_map_to_triples() {
        let result = ExtractionResult::new(
            vec![Entity::new("Elon Musk", "PERSON"), Entity::new("SpaceX", "ORG")],
            vec![Relation::new("Elon Musk", "SpaceX", "CEO_OF")],
        );

        let graph = TripleGraph::from_extraction(&result);

        assert_eq!(graph.triples().len(), 7);
        assert_eq!(graph.instances_of(ENTITY_CLASS), vec!["Elon_Musk", "SpaceX"]);
        assert_eq!(graph.values("Elon_Musk", "name"), vec![&Term::Literal("Elon Musk".into())]);
        assert_eq!(graph.values("Elon_Musk", "CEO_OF"), vec![&Term::Node("SpaceX".into())]);
        assert_eq!(graph.edges().count(), 1);
        assert!(graph.collisions().is_empty());
    }

    #[test]
    fn test_colliding_identifiers_are_reported() {
        let result = ExtractionResult::new(
            vec![
                Entity::new("A B", "X"),
                Entity::new("A_B", "Y"),
                Entity::new("C", "Z"),
            ],
            vec![],
        );

        let graph = TripleGraph::from_extraction(&result);

        assert_eq!(
            graph.collisions(),
            &[IdentifierCollision {
                identifier: "A_B".into(),
                names: vec!["A B".into(), "A_B".into()],
            }]
        );
        // Both names stay visible on the shared node
        assert_eq!(graph.values("A_B", "name").len(), 2);
    }
}
