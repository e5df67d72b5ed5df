pub mod loop_;
pub mod registry;
pub mod repl;

pub use loop_::AgentLoop;
pub use registry::{FnTool, ToolRegistry};
pub use repl::run_repl;
