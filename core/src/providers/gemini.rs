use crate::error::Result;
use crate::providers::utils::{check_status, http_client, into_model_response};
use crate::traits::{
    ChatMessage, ChatRequest, ModelResponse, Provider, Role, ToolCall, ToolChoice, ToolSpec,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTools>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_config: Option<GeminiToolConfig>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTools {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolConfig {
    function_calling_config: GeminiFunctionCallingConfig,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionCallingConfig {
    mode: &'static str,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

/// Binding for Google's Gemini `generateContent` API.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(120),
            api_key: api_key.into(),
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 1.0,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Splits system messages into the system instruction and maps the rest
    /// onto Gemini's user/model turns.
    fn convert_messages(messages: &[ChatMessage]) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let system: Vec<GeminiPart> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| GeminiPart {
                text: Some(m.content.clone()),
                ..Default::default()
            })
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| match m.role {
                Role::Assistant if !m.requested_calls().is_empty() => GeminiContent {
                    role: Some(gemini_role(m.role).to_string()),
                    parts: m
                        .requested_calls()
                        .iter()
                        .map(|c| GeminiPart {
                            function_call: Some(GeminiFunctionCall {
                                name: c.name.clone(),
                                args: serde_json::from_str(&c.arguments)
                                    .unwrap_or_else(|_| json!({})),
                            }),
                            ..Default::default()
                        })
                        .collect(),
                },
                Role::Tool => GeminiContent {
                    role: Some("user".into()),
                    parts: vec![GeminiPart {
                        function_response: Some(GeminiFunctionResponse {
                            name: m.name.clone().unwrap_or_default(),
                            response: json!({ "content": m.content }),
                        }),
                        ..Default::default()
                    }],
                },
                role => GeminiContent {
                    role: Some(gemini_role(role).to_string()),
                    parts: vec![GeminiPart {
                        text: Some(m.content.clone()),
                        ..Default::default()
                    }],
                },
            })
            .collect();

        let system = (!system.is_empty()).then_some(GeminiContent {
            role: None,
            parts: system,
        });
        (system, contents)
    }

    fn convert_tools(tools: &[ToolSpec]) -> Vec<GeminiTools> {
        vec![GeminiTools {
            function_declarations: tools
                .iter()
                .map(|t| GeminiFunctionDeclaration {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                })
                .collect(),
        }]
    }
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::Assistant => "model",
        _ => "user",
    }
}

fn calling_mode(choice: ToolChoice) -> &'static str {
    match choice {
        ToolChoice::Auto => "AUTO",
        ToolChoice::None => "NONE",
        ToolChoice::Required => "ANY",
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(&self, request: ChatRequest<'_>) -> Result<ModelResponse> {
        let (system_instruction, contents) = Self::convert_messages(request.messages);
        let gemini_request = GeminiRequest {
            contents,
            system_instruction,
            tools: request.tools.map(Self::convert_tools),
            tool_config: request.tools.map(|_| GeminiToolConfig {
                function_calling_config: GeminiFunctionCallingConfig {
                    mode: calling_mode(request.tool_choice),
                },
            }),
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_request)
            .send()
            .await?;

        let gemini_response: GeminiResponse = check_status(response, "Gemini").await?.json().await?;

        let parts = gemini_response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();
        for part in parts {
            if let Some(text) = part.text {
                texts.push(text);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall::new(call.name, call.args.to_string()));
            }
        }

        let text = (!texts.is_empty()).then(|| texts.concat());
        Ok(into_model_response("Gemini", text, tool_calls))
    }
}
