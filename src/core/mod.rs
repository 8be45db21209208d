// Public modules
pub mod api;
pub mod cache;
pub mod config;
pub mod detect;
pub mod environment;
pub mod error;
pub mod exec;
pub mod options;
pub mod project;
pub mod result;
pub mod script;
pub mod ssh_keys;
pub mod step;
pub mod tunnel;
pub mod watch;

// Public modules for CLI access
pub mod defaults;
pub mod paths;

#[cfg(test)]
pub(crate) mod testing;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
pub use result::{Status, StepResult};
pub use script::{Script, ScriptReport};
