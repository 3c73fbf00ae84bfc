pub mod environment;
pub mod executor;
pub mod merge;

pub use environment::TerminalEnvironment;
pub use executor::{build_command_string, ExecutionResult, TerminalError, TmuxControl, DEFAULT_TMUX_PROGRAM};
pub use merge::{merge_prompt, MergeHandoff, DEFAULT_AGENT_PROGRAM};
