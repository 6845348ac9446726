use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, user-level view of the shell session state.
///
/// The environment contains:
/// - `current_dir` / `previous_dir`: working directory tracking for `cd`
///   (including `cd -`).
/// - `last_status`: the textual disposition of the most recent foreground
///   command, reported verbatim by the `status` builtin.
/// - `should_exit`: a flag the interpreter loop checks to know when to
///   terminate.
#[derive(Debug, Clone)]
pub struct Environment {
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// The working directory before the last successful `cd`, if any.
    pub previous_dir: Option<PathBuf>,
    /// Disposition of the last foreground command: `"exit value N"` or
    /// `"terminated by signal N"`. Always defined, never empty.
    pub last_status: String,
    /// When set to true, indicates that the interactive loop should exit.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// `current_dir` comes from `std::env::current_dir()`; `last_status`
    /// starts as `"exit value 0"` so `status` has something to report before
    /// any command has run.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            current_dir,
            previous_dir: None,
            last_status: String::from("exit value 0"),
            should_exit: false,
        }
    }

    /// Get the value of an environment variable from the process environment.
    pub fn get_var(&self, key: &str) -> Option<String> {
        stdenv::var(key).ok()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
