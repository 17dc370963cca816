use std::collections::HashSet;

use crate::schema::{Entity, ExtractionResult};

pub const UNKNOWN_ENTITY_TYPE: &str = "UNKNOWN";
pub const INFERRED_DESCRIPTION: &str = "Inferred from relation";

/// Add a placeholder entity for every relation endpoint that is not a known
/// entity name. Each missing name gets exactly one placeholder.
///
/// Returns the names that were synthesized, in the order they were first
/// referenced.
pub fn repair_references(result: &mut ExtractionResult) -> Vec<String> {
    let mut known: HashSet<String> = result.entities.iter().map(|e| e.name.clone()).collect();
    let mut added = Vec::new();

    for relation in &result.relations {
        for endpoint in [&relation.source, &relation.target] {
            if known.insert(endpoint.clone()) {
                result.entities.push(
                    Entity::new(endpoint.clone(), UNKNOWN_ENTITY_TYPE)
                        .with_description(INFERRED_DESCRIPTION),
                );
                added.push(endpoint.clone());
            }
        }
    }

    added
}
