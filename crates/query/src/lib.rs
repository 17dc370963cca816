pub mod chat;
pub mod llm;

pub use chat::{ChatAnswer, GraphChat, NO_CONTEXT_ANSWER};
pub use llm::{QueryLLM, TextGenerator};
