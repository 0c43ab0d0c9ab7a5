//! Core automation agent types and trait definitions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// An external browser-automation agent.
///
/// Each call is independent: one instruction in, one raw payload out. The
/// agent makes no promise that its output matches the requested schema.
#[async_trait]
pub trait AutomationAgent: Send + Sync {
    /// Run one instruction to completion.
    async fn execute(&self, instruction: &str, schema: &SchemaDescriptor) -> Result<RawResult, AgentError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Whatever the agent produced as its final result, untyped.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// Free text (usually JSON, sometimes wrapped in prose or code fences)
    Text(String),
    /// Already-structured JSON value
    Structured(Value),
    /// Agent finished without a final result
    Empty,
}

impl RawResult {
    pub fn text(text: impl Into<String>) -> Self {
        RawResult::Text(text.into())
    }

    /// Payload as text, for retention alongside parse failures.
    pub fn to_text(&self) -> String {
        match self {
            RawResult::Text(text) => text.clone(),
            RawResult::Structured(value) => value.to_string(),
            RawResult::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawResult::Text(text) => text.trim().is_empty(),
            RawResult::Structured(value) => value.is_null(),
            RawResult::Empty => true,
        }
    }

    /// Map an optional JSON `final_result` field from an agent response.
    pub fn from_final_result(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => RawResult::Empty,
            Some(Value::String(text)) => RawResult::Text(text),
            Some(other) => RawResult::Structured(other),
        }
    }
}

/// Output schema handed to the agent alongside the instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// Schema title
    pub name: String,
    /// JSON Schema document
    pub schema: Value,
}

impl SchemaDescriptor {
    /// Schema of one company's order history, matching `ExtractionResult`'s wire form.
    pub fn order_history() -> Self {
        let nullable_string = json!({ "type": ["string", "null"] });
        Self {
            name: "CompanyInfo".to_string(),
            schema: json!({
                "type": "object",
                "required": ["company_name", "info_url", "order_history"],
                "properties": {
                    "company_name": { "type": "string" },
                    "info_url": { "type": "string" },
                    "order_history": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "arrival_time": nullable_string,
                                "hs_code": nullable_string,
                                "product_description": nullable_string,
                                "amount_usd": { "type": ["number", "null"] }
                            }
                        }
                    }
                }
            }),
        }
    }

    /// One line per field, `name: type`, for embedding in instructions.
    pub fn field_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        collect_fields(&self.schema, "", &mut lines);
        lines
    }
}

fn collect_fields(schema: &Value, prefix: &str, lines: &mut Vec<String>) {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return;
    };
    for (name, prop) in properties {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        lines.push(format!("{}: {}", path, describe_type(prop)));
        if let Some(items) = prop.get("items") {
            collect_fields(items, &format!("{}[]", path), lines);
        }
    }
}

fn describe_type(prop: &Value) -> String {
    match prop.get("type") {
        Some(Value::String(t)) if t == "array" => "array".to_string(),
        Some(Value::String(t)) => t.clone(),
        Some(Value::Array(types)) => {
            let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
            if names.contains(&"null") {
                let inner: Vec<&str> = names.into_iter().filter(|t| *t != "null").collect();
                format!("{} or null", inner.join(" | "))
            } else {
                names.join(" | ")
            }
        }
        _ => "any".to_string(),
    }
}

/// Errors that can occur while invoking the agent
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Agent API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Agent reported failure: {0}")]
    Execution(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_result_from_final_result() {
        assert_eq!(RawResult::from_final_result(None), RawResult::Empty);
        assert_eq!(RawResult::from_final_result(Some(Value::Null)), RawResult::Empty);
        assert_eq!(
            RawResult::from_final_result(Some(json!("hello"))),
            RawResult::Text("hello".to_string())
        );
        assert_eq!(
            RawResult::from_final_result(Some(json!({"a": 1}))),
            RawResult::Structured(json!({"a": 1}))
        );
    }

    #[test]
    fn test_raw_result_to_text() {
        assert_eq!(RawResult::text("abc").to_text(), "abc");
        assert_eq!(RawResult::Structured(json!([1, 2])).to_text(), "[1,2]");
        assert_eq!(RawResult::Empty.to_text(), "");
    }

    #[test]
    fn test_raw_result_is_empty() {
        assert!(RawResult::Empty.is_empty());
        assert!(RawResult::text("  \n").is_empty());
        assert!(RawResult::Structured(Value::Null).is_empty());
        assert!(!RawResult::text("{}").is_empty());
    }

    #[test]
    fn test_schema_field_lines() {
        let schema = SchemaDescriptor::order_history();
        let lines = schema.field_lines();

        assert!(lines.contains(&"company_name: string".to_string()));
        assert!(lines.contains(&"info_url: string".to_string()));
        assert!(lines.contains(&"order_history: array".to_string()));
        assert!(lines.contains(&"order_history[].hs_code: string or null".to_string()));
        assert!(lines.contains(&"order_history[].amount_usd: number or null".to_string()));
    }

    #[test]
    fn test_agent_error_display() {
        let err = AgentError::MissingApiKey {
            env_var: "GOOGLE_API_KEY".to_string(),
        };
        assert_eq!(err.to_string(), "Missing API key: environment variable GOOGLE_API_KEY not set");
    }
}
