use crate::agent::ToolRegistry;
use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::traits::{
    ChatMessage, ChatRequest, ModelResponse, Provider, Role, ToolCall, ToolChoice,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const DEFAULT_MAX_TOOL_CALLS: usize = 10;

/// Owns one conversation transcript and drives the model/tool exchange for
/// each user turn.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    tool_registry: Arc<ToolRegistry>,
    transcript: Vec<ChatMessage>,
    max_tool_calls: usize,
    retry: RetryConfig,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tool_registry,
            transcript: vec![],
            max_tool_calls: DEFAULT_MAX_TOOL_CALLS,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the leading system message, replacing any previous one.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return self;
        }
        match self.transcript.first_mut() {
            Some(first) if first.role == Role::System => first.content = prompt,
            _ => self.transcript.insert(0, ChatMessage::system(prompt)),
        }
        self
    }

    pub fn with_max_tool_calls(mut self, max: usize) -> Self {
        self.max_tool_calls = max;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Runs one turn. On failure the transcript is restored to what it was
    /// before `message` was appended.
    pub async fn process(&mut self, message: &str) -> Result<String> {
        let checkpoint = self.transcript.len();
        self.transcript.push(ChatMessage::user(message));

        let result = self.resolve_turn().await;
        if let Err(e) = &result {
            warn!(error = %e, "Turn failed, discarding its messages");
            self.transcript.truncate(checkpoint);
        }
        result
    }

    async fn resolve_turn(&mut self) -> Result<String> {
        let tools = self.tool_registry.specs();
        let mut tool_calls = 0;

        loop {
            let request = ChatRequest {
                messages: &self.transcript,
                tools: if tools.is_empty() { None } else { Some(&tools) },
                tool_choice: ToolChoice::Auto,
            };

            match self.call_with_retry(request).await? {
                ModelResponse::FinalAnswer(text) => {
                    self.transcript.push(ChatMessage::assistant(text.clone()));
                    return Ok(text);
                }
                ModelResponse::ToolCall(call) => {
                    tool_calls += 1;
                    if tool_calls > self.max_tool_calls {
                        return Err(Error::ToolLoopExceeded {
                            max: self.max_tool_calls,
                        });
                    }

                    self.transcript
                        .push(ChatMessage::assistant_with_tool_call(call.clone()));
                    let content = self.dispatch(&call).await?;
                    self.transcript.push(ChatMessage::tool_result(&call, content));
                }
            }
        }
    }

    async fn dispatch(&self, call: &ToolCall) -> Result<String> {
        info!(tool = %call.name, arguments = %call.arguments, "Dispatching tool call");

        match self.tool_registry.invoke(&call.name, &call.arguments).await {
            Ok(output) => Ok(output),
            Err(e) if e.is_recoverable_by_model() => {
                warn!(tool = %call.name, error = %e, "Reporting tool failure to the model");
                Ok(format!("Error: {}", e))
            }
            Err(e) => Err(e),
        }
    }

    async fn call_with_retry(&self, request: ChatRequest<'_>) -> Result<ModelResponse> {
        let mut attempt = 0;
        let mut backoff = self.retry.initial_backoff();

        loop {
            debug!(
                provider = self.provider.name(),
                messages = request.messages.len(),
                attempt,
                "Calling model"
            );

            match self.provider.chat(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    warn!(
                        error = %e,
                        attempt,
                        max_retries = self.retry.max_retries,
                        "Model call failed, retrying in {:?}",
                        backoff
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.retry.max_backoff());
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AbortTurn;
    use crate::providers::MockProvider;
    use crate::tools::default_registry;
    use serde_json::json;

    const SYSTEM: &str = "You are a helpful assistant. You can tell jokes about the weather.";

    fn agent(provider: Arc<MockProvider>) -> AgentLoop {
        AgentLoop::new(provider, Arc::new(default_registry().unwrap()))
            .with_system_prompt(SYSTEM)
            .with_retry(RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 10,
                max_backoff_ms: 20,
            })
    }

    fn weather_call(location: &str) -> Result<ModelResponse> {
        Ok(ModelResponse::ToolCall(
            ToolCall::new("get_weather", json!({ "location": location }).to_string())
                .with_id("call_1"),
        ))
    }

    fn answer(text: &str) -> Result<ModelResponse> {
        Ok(ModelResponse::FinalAnswer(text.to_string()))
    }

    /// Every assistant tool request is followed by exactly one matching tool message.
    fn assert_calls_answered(transcript: &[ChatMessage]) {
        for (i, msg) in transcript.iter().enumerate() {
            if let [call] = msg.requested_calls() {
                let reply = &transcript[i + 1];
                assert_eq!(reply.role, Role::Tool);
                assert_eq!(reply.name.as_deref(), Some(call.name.as_str()));
                assert_eq!(reply.tool_call_id.as_deref(), Some(call.id.as_str()));
            }
            if msg.role == Role::Tool {
                assert!(!transcript[i - 1].requested_calls().is_empty());
            }
        }
    }

    #[test]
    fn system_prompt_is_replaced_not_stacked() {
        let provider = Arc::new(MockProvider::new(vec![]));
        let agent = agent(provider).with_system_prompt("Answer in French.");

        let system: Vec<_> = agent
            .transcript()
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(system, ["Answer in French."]);
        assert_eq!(agent.transcript().len(), 1);
    }

    #[tokio::test]
    async fn empty_answer_ends_the_turn() {
        let provider = Arc::new(MockProvider::new(vec![answer("")]));
        let mut agent = agent(provider.clone());

        let reply = agent.process("Say nothing.").await.unwrap();
        assert_eq!(reply, "");
        assert_eq!(provider.call_count(), 1);
        let last = agent.transcript().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.content.is_empty());
    }

    #[tokio::test]
    async fn weather_scenario() {
        let provider = Arc::new(MockProvider::new(vec![
            weather_call("Tokyo"),
            answer("It's sunny in Tokyo, perfect for a picnic!"),
        ]));
        let mut agent = agent(provider.clone());

        let reply = agent.process("What's the weather in Tokyo?").await.unwrap();
        assert!(reply.contains("sunny"));

        let transcript = agent.transcript();
        let roles: Vec<_> = transcript.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(transcript[3].content, "The weather in Tokyo is sunny.");
        assert_eq!(transcript[3].name.as_deref(), Some("get_weather"));
        assert_calls_answered(transcript);

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].len(), 2);
        assert_eq!(requests[1].len(), 4);
        assert_eq!(requests[1][3].content, "The weather in Tokyo is sunny.");
    }

    #[tokio::test]
    async fn chained_tool_calls() {
        let provider = Arc::new(MockProvider::new(vec![
            weather_call("Paris"),
            Ok(ModelResponse::ToolCall(ToolCall::new(
                "get_joke",
                r#"{"weather":"sunny"}"#,
            ))),
            answer("Here's one: sunny clouds stick together."),
        ]));
        let mut agent = agent(provider.clone());

        agent.process("Weather joke for Paris please").await.unwrap();
        assert_eq!(provider.call_count(), 3);
        let tools: Vec<_> = agent
            .transcript()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .map(|m| m.name.clone().unwrap())
            .collect();
        assert_eq!(tools, ["get_weather", "get_joke"]);
        assert_calls_answered(agent.transcript());
    }

    #[tokio::test]
    async fn transcript_grows_across_turns() {
        let provider = Arc::new(MockProvider::new(vec![
            answer("hi"),
            weather_call("Rome"),
            answer("sunny"),
            answer("bye"),
        ]));
        let mut agent = agent(provider);

        let mut previous: Vec<ChatMessage> = agent.transcript().to_vec();
        for input in ["hello", "weather in Rome?", "thanks"] {
            agent.process(input).await.unwrap();
            let current = agent.transcript();
            assert!(current.len() > previous.len());
            assert_eq!(&current[..previous.len()], previous.as_slice());
            previous = current.to_vec();
        }
    }

    #[tokio::test]
    async fn adversarial_model_hits_tool_call_limit() {
        let provider = Arc::new(MockProvider::repeating(weather_call("Nowhere")));
        let mut agent = agent(provider.clone());
        let before = agent.transcript().to_vec();

        let err = agent.process("loop forever").await.unwrap_err();
        assert!(matches!(err, Error::ToolLoopExceeded { max: 10 }));
        assert_eq!(provider.call_count(), 11);
        assert_eq!(agent.transcript(), before.as_slice());
    }

    #[tokio::test]
    async fn tool_call_limit_is_configurable() {
        let provider = Arc::new(MockProvider::repeating(weather_call("Nowhere")));
        let mut agent = agent(provider.clone()).with_max_tool_calls(2);
        assert!(matches!(
            agent.process("go").await,
            Err(Error::ToolLoopExceeded { max: 2 })
        ));
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_to_model() {
        let provider = Arc::new(MockProvider::new(vec![
            Ok(ModelResponse::ToolCall(ToolCall::new("get_time", "{}"))),
            answer("Sorry, I can't tell the time."),
        ]));
        let mut agent = agent(provider.clone());

        agent.process("What time is it?").await.unwrap();
        let tool_msg = &agent.transcript()[3];
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.name.as_deref(), Some("get_time"));
        assert_eq!(tool_msg.content, "Error: Tool 'get_time' not found");
        assert_calls_answered(agent.transcript());
    }

    #[tokio::test]
    async fn malformed_arguments_are_reported_to_model() {
        let provider = Arc::new(MockProvider::new(vec![
            Ok(ModelResponse::ToolCall(ToolCall::new("get_weather", "{location:"))),
            weather_call("Tokyo"),
            answer("sunny"),
        ]));
        let mut agent = agent(provider);

        agent.process("weather?").await.unwrap();
        let tool_msgs: Vec<_> = agent
            .transcript()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert!(tool_msgs[0].content.starts_with("Error: Invalid arguments for tool 'get_weather'"));
        assert_eq!(tool_msgs[1].content, "The weather in Tokyo is sunny.");
    }

    #[tokio::test]
    async fn fatal_tool_error_aborts_turn() {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn("get_weather", "Weather", json!({}), |_| {
                Err(AbortTurn("API key revoked".into()).into())
            })
            .unwrap();
        let provider = Arc::new(MockProvider::new(vec![weather_call("Oslo")]));
        let mut agent = AgentLoop::new(provider.clone(), Arc::new(registry));

        let err = agent.process("weather?").await.unwrap_err();
        assert!(matches!(err, Error::ToolExecution { fatal: true, .. }));
        assert!(agent.transcript().is_empty());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_transport_errors() {
        let provider = Arc::new(MockProvider::new(vec![
            Err(Error::transport("503 Service Unavailable", true)),
            Err(Error::transport("connection reset", true)),
            answer("made it"),
        ]));
        let mut agent = agent(provider.clone());

        assert_eq!(agent.process("hi").await.unwrap(), "made it");
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_leave_transcript_unchanged() {
        let provider = Arc::new(MockProvider::repeating(Err(Error::transport(
            "503 Service Unavailable",
            true,
        ))));
        let mut agent = agent(provider.clone());
        let before = agent.transcript().to_vec();

        let err = agent.process("hi").await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(provider.call_count(), 3);
        assert_eq!(agent.transcript(), before.as_slice());
    }

    #[tokio::test]
    async fn terminal_transport_error_is_not_retried() {
        let provider = Arc::new(MockProvider::new(vec![Err(Error::transport(
            "401 Unauthorized",
            false,
        ))]));
        let mut agent = agent(provider.clone());

        assert!(agent.process("hi").await.is_err());
        assert_eq!(provider.call_count(), 1);
        assert_eq!(agent.transcript().len(), 1);
    }

    #[tokio::test]
    async fn sends_catalog_with_auto_choice() {
        let provider = Arc::new(MockProvider::new(vec![answer("ok")]));
        let mut agent = agent(provider.clone());
        agent.process("hi").await.unwrap();

        let (tools, choice) = provider.last_tools().unwrap();
        assert_eq!(tools, ["get_weather", "get_joke"]);
        assert_eq!(choice, ToolChoice::Auto);
    }
}
