//! Scripted deployment over SSH: steps composed into scripts, run against
//! the hosts of a project environment.

/// Print `[prefix] message` to stderr when stderr is a terminal. Piped runs
/// stay quiet so stdout JSON is the only output.
///
/// ```ignore
/// log_status!("script", "Running {} on {}...", script, environment);
/// log_status!("ssh", "Generated {}", public_key.display());
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        if ::std::io::IsTerminal::is_terminal(&::std::io::stderr()) {
            eprintln!(concat!("[", $prefix, "] {}"), format_args!($($arg)*));
        }
    };
}

pub mod core;
pub mod utils;

// `stagehand::script` rather than `stagehand::core::script`.
pub use core::*;
pub use utils::*;
