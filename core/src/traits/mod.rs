pub mod input;
pub mod provider;
pub mod tool;

pub use input::{LineInput, ScriptedInput};
pub use provider::{
    ChatMessage, ChatRequest, ModelResponse, Provider, Role, ToolCall, ToolChoice,
};
pub use tool::{Tool, ToolArgs, ToolSpec};
