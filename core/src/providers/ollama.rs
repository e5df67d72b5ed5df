use crate::error::Result;
use crate::providers::utils::{check_status, http_client, into_model_response};
use crate::traits::{ChatMessage, ChatRequest, ModelResponse, Provider, ToolCall, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OllamaTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct OllamaToolCallRequest {
    function: OllamaFunctionRequest,
}

#[derive(Debug, Serialize)]
struct OllamaFunctionRequest {
    name: String,
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    r#type: String,
    function: OllamaToolFunction,
}

#[derive(Debug, Serialize)]
struct OllamaToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OllamaToolCallResponse>>,
}

#[derive(Debug, Deserialize)]
struct OllamaToolCallResponse {
    function: OllamaFunctionResponse,
}

#[derive(Debug, Deserialize)]
struct OllamaFunctionResponse {
    name: String,
    arguments: serde_json::Value,
}

/// Binding for a local Ollama server's `/api/chat` endpoint.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
}

impl OllamaProvider {
    pub fn new() -> Self {
        Self {
            client: http_client(300),
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            temperature: 1.0,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    fn convert_messages(&self, messages: &[ChatMessage]) -> Vec<OllamaMessage> {
        messages
            .iter()
            .map(|m| {
                // Ollama expects arguments as an object, not a JSON string.
                let tool_calls = m.tool_calls.as_ref().map(|tcs| {
                    tcs.iter()
                        .map(|tc| OllamaToolCallRequest {
                            function: OllamaFunctionRequest {
                                name: tc.name.clone(),
                                arguments: serde_json::from_str(&tc.arguments)
                                    .unwrap_or_else(|_| serde_json::json!({})),
                            },
                        })
                        .collect()
                });

                OllamaMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                    tool_calls,
                    tool_name: m.name.clone(),
                }
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolSpec]) -> Vec<OllamaTool> {
        tools
            .iter()
            .map(|t| OllamaTool {
                r#type: "function".to_string(),
                function: OllamaToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    // Ollama has no tool_choice knob; the model always decides.
    async fn chat(&self, request: ChatRequest<'_>) -> Result<ModelResponse> {
        let ollama_request = OllamaRequest {
            model: self.model.clone(),
            messages: self.convert_messages(request.messages),
            tools: request.tools.map(Self::convert_tools),
            options: Some(OllamaOptions {
                temperature: self.temperature,
            }),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&ollama_request)
            .send()
            .await?;

        let ollama_response: OllamaResponse = check_status(response, "Ollama").await?.json().await?;

        let tool_calls: Vec<ToolCall> = ollama_response
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall::new(tc.function.name, tc.function.arguments.to_string()))
            .collect();

        Ok(into_model_response("Ollama", ollama_response.message.content, tool_calls))
    }
}
