//! Wire types for the `generateContent` model endpoint and the transaction response schema.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tally_core::Category;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub system_instruction: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateRequest {
    /// Free-text request: one user part plus a system instruction
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::text(user)],
            system_instruction: Content::text(system),
            generation_config: None,
        }
    }

    /// Ask for JSON output constrained by `schema`
    pub fn with_json_schema(mut self, schema: Value) -> Self {
        self.generation_config = Some(GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: schema,
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

impl GenerateResponse {
    /// `candidates[0].content.parts[0].text`
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }

    /// Build a response carrying a single text part
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(CandidateContent {
                    parts: vec![ResponsePart {
                        text: Some(text.into()),
                    }],
                }),
            }],
        }
    }
}

/// Response schema for the transaction array, in the model's OpenAPI-subset dialect.
pub fn transaction_schema() -> Value {
    let categories: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "date": {
                    "type": "STRING",
                    "description": "The transaction date in YYYY-MM-DD format."
                },
                "description": {
                    "type": "STRING",
                    "description": "The cleaned transaction description, e.g., 'ALDI Sued Purchase', 'Payment to John Doe'."
                },
                "amount": {
                    "type": "NUMBER",
                    "description": "The numeric value of the transaction. Should be positive."
                },
                "type": {
                    "type": "STRING",
                    "enum": ["Money Out", "Money In"],
                    "description": "Direction of money flow."
                },
                "category": {
                    "type": "STRING",
                    "enum": categories,
                    "description": "The classified category."
                }
            },
            "required": ["date", "description", "amount", "type", "category"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let req = GenerateRequest::new("be brief", "hello").with_json_schema(transaction_schema());
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(v["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["generationConfig"]["responseSchema"]["type"], "ARRAY");
    }

    #[test]
    fn test_free_text_request_has_no_generation_config() {
        let v = serde_json::to_value(GenerateRequest::new("s", "u")).unwrap();
        assert!(v.get("generationConfig").is_none());
    }

    #[test]
    fn test_schema_lists_all_categories() {
        let schema = transaction_schema();
        let cats = schema["items"]["properties"]["category"]["enum"].as_array().unwrap();
        assert_eq!(cats.len(), 13);
        assert!(cats.iter().any(|c| c == "Online Subscription"));
    }

    #[test]
    fn test_first_text_path() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"[]"}],"role":"model"},"finishReason":"STOP"}]}"#;
        let resp: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.first_text(), Some("[]"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert_eq!(empty.first_text(), None);
    }
}
