use crate::error::{Error, Result};
use crate::traits::{ChatMessage, ChatRequest, ModelResponse, Provider, ToolChoice};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

enum Script {
    Sequence(VecDeque<Result<ModelResponse>>),
    Repeat(Box<dyn Fn() -> Result<ModelResponse> + Send + Sync>),
}

struct Recorded {
    messages: Vec<ChatMessage>,
    tools: Vec<String>,
    tool_choice: ToolChoice,
}

/// A provider that replays pre-configured responses and records every request.
pub struct MockProvider {
    script: Mutex<Script>,
    recorded: Mutex<Vec<Recorded>>,
}

impl MockProvider {
    /// Replays `responses` in order; once exhausted, answers with an empty final answer.
    pub fn new(responses: Vec<Result<ModelResponse>>) -> Self {
        Self::with_script(Script::Sequence(responses.into()))
    }

    /// Answers every call with a copy of `response`. Errors are replayed as
    /// transport errors.
    pub fn repeating(response: Result<ModelResponse>) -> Self {
        Self::with_script(Script::Repeat(Box::new(move || match &response {
            Ok(r) => Ok(r.clone()),
            Err(Error::Transport { message, retryable }) => {
                Err(Error::transport(message.clone(), *retryable))
            }
            Err(e) => Err(Error::transport(e.to_string(), false)),
        })))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script: Mutex::new(script),
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }

    /// Transcripts sent on each call, oldest first.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.recorded
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.messages.clone())
            .collect()
    }

    /// Tool names and choice policy of the most recent call.
    pub fn last_tools(&self) -> Option<(Vec<String>, ToolChoice)> {
        self.recorded
            .lock()
            .unwrap()
            .last()
            .map(|r| (r.tools.clone(), r.tool_choice))
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn chat(&self, request: ChatRequest<'_>) -> Result<ModelResponse> {
        self.recorded.lock().unwrap().push(Recorded {
            messages: request.messages.to_vec(),
            tools: request
                .tools
                .unwrap_or_default()
                .iter()
                .map(|t| t.name.clone())
                .collect(),
            tool_choice: request.tool_choice,
        });

        match &mut *self.script.lock().unwrap() {
            Script::Sequence(responses) => responses
                .pop_front()
                .unwrap_or_else(|| Ok(ModelResponse::FinalAnswer(String::new()))),
            Script::Repeat(make) => make(),
        }
    }
}
