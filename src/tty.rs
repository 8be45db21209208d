//! Terminal I/O for the CLI: TTY detection and prompts.

use std::io::{self, BufRead, IsTerminal, Write};
use std::process::{Command, Stdio};

use stagehand::{Error, Result};

pub fn require_tty_for_interactive() -> bool {
    io::stdin().is_terminal() && io::stderr().is_terminal()
}

pub fn prompt(message: &str) -> Result<String> {
    eprint!("{}", message);
    io::stderr().flush().ok();

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| Error::internal_io(e.to_string(), Some("read input".to_string())))?;

    Ok(line.trim().to_string())
}

/// Prompt with terminal echo turned off while the answer is typed.
pub fn prompt_password(message: &str) -> Result<String> {
    let hidden = set_echo(false);
    let answer = prompt(message);
    if hidden {
        set_echo(true);
        eprintln!();
    }
    answer
}

fn set_echo(enabled: bool) -> bool {
    if !io::stdin().is_terminal() {
        return false;
    }

    Command::new("stty")
        .arg(if enabled { "echo" } else { "-echo" })
        .stdin(Stdio::inherit())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Print status message to stderr if running in a terminal.
pub fn status(message: &str) {
    if io::stderr().is_terminal() {
        eprintln!("{}", message);
    }
}
