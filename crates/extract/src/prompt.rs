use serde_json::{Value, json};

pub fn build_extraction_prompt(chunk_text: &str) -> String {
    format!(
        r#"Extract a knowledge graph (entities and relationships) from the following text.

INSTRUCTIONS:
1. Identify key entities (people, organizations, locations, concepts, technologies, events)
2. Extract directed relationships between those entities
3. Output ONLY valid JSON, nothing else
4. Use the exact schema below

SCHEMA:
{{
  "entities": [
    {{"name": "Entity Name", "type": "PERSON|ORGANIZATION|LOCATION|CONCEPT|TECHNOLOGY|EVENT", "description": "brief description"}}
  ],
  "relations": [
    {{"source": "Entity Name", "target": "Other Entity", "type": "RELATION_TYPE", "description": "context from the text"}}
  ]
}}

RULES:
- Refer to entities by their exact name in "source" and "target"
- Each entity name appears at most once in "entities"
- Relation types are UPPER_SNAKE_CASE verbs: WORKS_FOR, LOCATED_IN, FOUNDED, PART_OF, ...
- Be precise and avoid duplicates
- Output ONLY the JSON object, no markdown, no explanations

TEXT:
{}

JSON OUTPUT:"#,
        chunk_text
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}

/// JSON schema handed to Ollama's `format` field to constrain the output.
pub fn extraction_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "entities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "type": {"type": "string"},
                        "description": {"type": "string"}
                    },
                    "required": ["name", "type"]
                }
            },
            "relations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "source": {"type": "string"},
                        "target": {"type": "string"},
                        "type": {"type": "string"},
                        "description": {"type": "string"}
                    },
                    "required": ["source", "target", "type"]
                }
            }
        },
        "required": ["entities", "relations"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_chunk_text() {
        let prompt = build_extraction_prompt("SpaceX is headquartered in Hawthorne.");
        assert!(prompt.contains("SpaceX is headquartered in Hawthorne."));
        assert!(prompt.trim_end().ends_with("JSON OUTPUT:"));
    }

    #[test]
    fn test_schema_requires_merge_keys() {
        let schema = extraction_schema();
        assert_eq!(schema["properties"]["entities"]["items"]["required"], json!(["name", "type"]));
        assert_eq!(
            schema["properties"]["relations"]["items"]["required"],
            json!(["source", "target", "type"])
        );
    }
}
