//! HTTP client for a browser-automation agent service
//!
//! The service runs one agent per request: it receives the task text and the
//! output schema, drives a browser, and answers with the agent's final result.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::agent::client::{AgentError, AutomationAgent, RawResult, SchemaDescriptor};
use crate::error::{Result, ScoutError};

/// Default agent service URL
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8765";

/// Default model the agent drives the browser with
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration for the HTTP agent
#[derive(Debug, Clone)]
pub struct HttpAgentConfig {
    pub endpoint: String,
    pub model: String,
    pub use_vision: bool,
    /// Transport-level ceiling; the orchestrator applies its own per-task timeout
    pub request_timeout: Duration,
}

impl Default for HttpAgentConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            use_vision: true,
            request_timeout: Duration::from_secs(3600),
        }
    }
}

/// Agent reachable over HTTP
pub struct HttpAgent {
    client: Client,
    api_key: Option<String>,
    config: HttpAgentConfig,
}

impl HttpAgent {
    /// Create an agent, reading the API key from the named environment variable.
    ///
    /// A missing variable is an error only when a name was given.
    pub fn from_env(config: HttpAgentConfig, api_key_env: Option<&str>) -> Result<Self> {
        let api_key = match api_key_env {
            Some(var) => Some(std::env::var(var).map_err(|_| {
                ScoutError::Agent(
                    AgentError::MissingApiKey {
                        env_var: var.to_string(),
                    }
                    .to_string(),
                )
            })?),
            None => None,
        };
        Self::with_api_key(api_key, config)
    }

    /// Create an agent with an explicit API key
    pub fn with_api_key(api_key: Option<String>, config: HttpAgentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ScoutError::Agent(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn run_url(&self) -> String {
        format!("{}/run", self.config.endpoint.trim_end_matches('/'))
    }

    /// Build the request body for the agent service
    fn build_request(&self, instruction: &str, schema: &SchemaDescriptor) -> Value {
        json!({
            "task": instruction,
            "output_schema": schema.schema,
            "schema_name": schema.name,
            "model": self.config.model,
            "use_vision": self.config.use_vision,
        })
    }

    /// Parse the service response into a raw result
    fn parse_response(body: Value) -> std::result::Result<RawResult, AgentError> {
        if !body.is_object() {
            return Err(AgentError::InvalidResponse(format!("expected JSON object, got {}", body)));
        }

        if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
            let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
            return Err(AgentError::Execution(message));
        }

        Ok(RawResult::from_final_result(body.get("final_result").cloned()))
    }
}

#[async_trait]
impl AutomationAgent for HttpAgent {
    async fn execute(&self, instruction: &str, schema: &SchemaDescriptor) -> std::result::Result<RawResult, AgentError> {
        let body = self.build_request(instruction, schema);

        let mut request = self.client.post(self.run_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response.json().await?;
        Self::parse_response(body)
    }

    fn name(&self) -> &str {
        "http"
    }
}
