use thiserror::Error;

/// Failures the conversation loop distinguishes when deciding whether to
/// retry, feed the problem back to the model, or abort the turn.
#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM request failed: {message}")]
    Transport { message: String, retryable: bool },

    #[error("Invalid arguments for tool '{tool}': {reason}")]
    ArgumentParse { tool: String, reason: String },

    #[error("Tool '{0}' not found")]
    UnknownTool(String),

    #[error("Tool '{tool}' failed: {source}")]
    ToolExecution {
        tool: String,
        fatal: bool,
        #[source]
        source: anyhow::Error,
    },

    #[error("Tool '{0}' is already registered")]
    DuplicateName(String),

    #[error("Exceeded {max} chained tool calls in a single turn")]
    ToolLoopExceeded { max: usize },
}

impl Error {
    pub fn transport(message: impl Into<String>, retryable: bool) -> Self {
        Self::Transport {
            message: message.into(),
            retryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { retryable: true, .. })
    }

    /// Errors the model can recover from when told about them in a tool message.
    pub fn is_recoverable_by_model(&self) -> bool {
        match self {
            Self::ArgumentParse { .. } | Self::UnknownTool(_) => true,
            Self::ToolExecution { fatal, .. } => !fatal,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let retryable = e.is_timeout() || e.is_connect() || e.is_request();
        Self::Transport {
            message: e.to_string(),
            retryable,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Returned by a tool handler to abort the whole turn instead of reporting
/// the failure back to the model.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct AbortTurn(pub String);
