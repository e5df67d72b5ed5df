pub mod agent;
pub mod config;
pub mod error;
pub mod providers;
pub mod tools;
pub mod traits;

pub use agent::{AgentLoop, FnTool, ToolRegistry, run_repl};
pub use config::*;
pub use error::{AbortTurn, Error, Result};
pub use providers::*;
pub use tools::*;
pub use traits::*;
