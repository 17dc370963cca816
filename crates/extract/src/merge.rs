use std::collections::{HashMap, HashSet};

use crate::schema::{Entity, ExtractionResult, Relation};

/// Folds per-chunk results into one graph.
///
/// Entities are keyed by exact name and relations by (source, target, type).
/// The first occurrence of a key wins and later ones are dropped whole, so the
/// outcome depends only on the order results are fed in.
#[derive(Debug, Default)]
pub struct GraphMerger {
    entities: Vec<Entity>,
    entity_to_idx: HashMap<String, usize>,
    relations: Vec<Relation>,
    relation_keys: HashSet<(String, String, String)>,
    duplicates_dropped: usize,
}

impl GraphMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an entity with that name was already present.
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        if self.entity_to_idx.contains_key(&entity.name) {
            self.duplicates_dropped += 1;
            return false;
        }

        self.entity_to_idx.insert(entity.name.clone(), self.entities.len());
        self.entities.push(entity);
        true
    }

    /// Returns false when a relation with the same key was already present.
    pub fn add_relation(&mut self, relation: Relation) -> bool {
        let key = (
            relation.source.clone(),
            relation.target.clone(),
            relation.relation_type.clone(),
        );
        if !self.relation_keys.insert(key) {
            self.duplicates_dropped += 1;
            return false;
        }

        self.relations.push(relation);
        true
    }

    pub fn absorb(&mut self, result: ExtractionResult) {
        for entity in result.entities {
            self.add_entity(entity);
        }
        for relation in result.relations {
            self.add_relation(relation);
        }
    }

    pub fn get_entity(&self, name: &str) -> Option<&Entity> {
        self.entity_to_idx.get(name).map(|&idx| &self.entities[idx])
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.duplicates_dropped
    }

    pub fn finish(self) -> ExtractionResult {
        ExtractionResult {
            entities: self.entities,
            relations: self.relations,
        }
    }
}

/// Merge results in the order given.
pub fn merge_results<I>(results: I) -> ExtractionResult
where
    I: IntoIterator<Item = ExtractionResult>,
{
    let mut merger = GraphMerger::new();
    for result in results {
        merger.absorb(result);
    }
    merger.finish()
}
