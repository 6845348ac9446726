/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// This mirrors the convention used by POSIX shells and many command-line tools.
pub type ExitCode = i32;

/// Parsed representation of one user-entered invocation.
///
/// Produced by the line parser and consumed by the launcher. The argument
/// sequence still carries `<`/`>` redirection tokens; the
/// redirection planner strips them inside the forked child, so the value
/// stays immutable once handed to the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Program name as typed; resolved through PATH by `execvp` at exec time.
    pub program: String,
    /// Arguments after the program name, background marker already removed.
    pub args: Vec<String>,
    /// Trailing `&` was present. Whether it is honored is decided by the
    /// launcher, which also consults foreground-only mode.
    pub background: bool,
}

impl Command {
    pub fn new(program: impl Into<String>, args: Vec<String>, background: bool) -> Self {
        Self {
            program: program.into(),
            args,
            background,
        }
    }
}
