use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use extract::ChunkExtractor;
use index::GraphStore;
use serde::Serialize;
use tracing::{debug, warn};

use crate::llm::TextGenerator;

/// Relations fetched per matched entity
pub const NEIGHBORHOOD_LIMIT: usize = 10;

pub const NO_CONTEXT_ANSWER: &str =
    "I don't know. The knowledge graph has no information related to this question.";

#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub entities: Vec<String>,
    pub context: Vec<String>,
}

/// Answers questions from the 1-hop neighborhood of the entities they mention.
pub struct GraphChat {
    extractor: Arc<dyn ChunkExtractor>,
    store: Arc<dyn GraphStore>,
    llm: Arc<dyn TextGenerator>,
    neighborhood_limit: usize,
}

impl GraphChat {
    pub fn new(
        extractor: Arc<dyn ChunkExtractor>,
        store: Arc<dyn GraphStore>,
        llm: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            extractor,
            store,
            llm,
            neighborhood_limit: NEIGHBORHOOD_LIMIT,
        }
    }

    pub fn with_neighborhood_limit(mut self, limit: usize) -> Self {
        self.neighborhood_limit = limit;
        self
    }

    /// Candidate entity names in the question. Falls back to splitting on
    /// whitespace when structured extraction fails.
    pub async fn question_entities(&self, question: &str) -> Vec<String> {
        let candidates: Vec<String> = match self.extractor.extract(question).await {
            Ok(extraction) => extraction.entities.into_iter().map(|e| e.name).collect(),
            Err(e) => {
                warn!(error = %e, "Question extraction failed, falling back to keywords");
                question
                    .split_whitespace()
                    .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
                    .collect()
            }
        };

        let mut seen = HashSet::new();
        candidates
            .into_iter()
            .filter(|name| !name.is_empty() && seen.insert(name.clone()))
            .collect()
    }

    /// Context lines for the given entities, duplicates removed, first-seen order.
    pub async fn build_context(&self, names: &[String]) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut lines = Vec::new();

        for name in names {
            for neighbor in self.store.neighborhood(name, self.neighborhood_limit).await? {
                let line = neighbor.describe();
                if seen.insert(line.clone()) {
                    lines.push(line);
                }
            }
        }

        Ok(lines)
    }

    pub async fn answer(&self, question: &str) -> Result<ChatAnswer> {
        let entities = self.question_entities(question).await;
        let context = self.build_context(&entities).await?;

        debug!(entities = entities.len(), context_lines = context.len(), "Chat context built");

        if context.is_empty() {
            return Ok(ChatAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                entities,
                context,
            });
        }

        let answer = self.llm.generate(&build_answer_prompt(&context, question)).await?;

        Ok(ChatAnswer {
            answer: answer.trim().to_string(),
            entities,
            context,
        })
    }
}

fn build_answer_prompt(context: &[String], question: &str) -> String {
    format!(
        r#"You are a helpful assistant backed by a knowledge graph.

CONTEXT (facts from the graph):
{}

USER QUESTION: {}

INSTRUCTIONS:
- Answer using only the facts in the context above
- If the context does not contain the answer, say that you don't know
- Keep your answer concise and factual

ANSWER:"#,
        context.join("\n"),
        question
    )
}
