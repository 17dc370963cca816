use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::prompt;

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a Value, // "json" or a JSON schema for structured output
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }

    pub async fn generate(&self, prompt: &str, format: &Value) -> Result<String, ExtractionError> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            format,
            options: OllamaOptions { temperature: 0.0 },
        };

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExtractionError::Request(format!(
                "Ollama request failed: {}",
                response.status()
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::InvalidResponse(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(ollama_response.response)
    }

    /// Generate with retry for invalid JSON
    pub async fn generate_json_with_retry(
        &self,
        prompt: &str,
        schema: &Value,
        max_retries: usize,
    ) -> Result<String, ExtractionError> {
        let attempts = max_retries.max(1);
        let mut last = String::new();

        for attempt in 0..attempts {
            let response = if attempt == 0 {
                self.generate(prompt, schema).await?
            } else {
                // Ask the model to repair its previous output
                self.generate(&prompt::build_retry_prompt(&last), schema).await?
            };

            if serde_json::from_str::<Value>(&response).is_ok() {
                if attempt > 0 {
                    debug!(attempt = attempt + 1, "Recovered valid JSON after retry");
                }
                return Ok(response);
            }

            warn!(attempt = attempt + 1, max_retries = attempts, "LLM returned invalid JSON");
            last = response;
        }

        Err(ExtractionError::InvalidResponse(format!(
            "no valid JSON after {} attempts",
            attempts
        )))
    }
}
