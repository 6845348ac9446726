//! The interactive loop: reap, prompt, read, expand, parse, dispatch.

use std::io::{self, ErrorKind, Write};

use anyhow::Result;
use nix::unistd::getpid;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::env::Environment;
use crate::jobs::JobTable;
use crate::{builtin, launcher, parser, signals};

/// Prompt shown before every read.
const PROMPT: &str = ": ";

/// A small interactive shell: builtins run in-process, everything else is
/// forked and exec'd, with optional background execution and `<`/`>`
/// redirection.
///
/// The interpreter owns the session [`Environment`] and the [`JobTable`];
/// both are mutated only from this single thread.
pub struct Interpreter {
    env: Environment,
    jobs: JobTable,
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            jobs: JobTable::new(),
        }
    }

    /// The read-eval loop. Returns once the user enters `exit` (or closes
    /// stdin), after every outstanding background job has been killed and
    /// reaped.
    pub fn repl(&mut self) -> Result<()> {
        signals::install_shell_handlers()?;
        let mut editor = DefaultEditor::new()?;
        let shell_pid = getpid().as_raw();
        let mut out = io::stdout();

        while !self.env.should_exit {
            // Completed background jobs are reported before the prompt, never
            // concurrently with it.
            self.jobs.reap_completed(&mut out)?;
            out.flush()?;

            let line = match editor.readline(PROMPT) {
                Ok(line) => line,
                // The shell itself is immune to Ctrl-C; just re-prompt.
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(ReadlineError::Io(ref e)) if e.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            if !line.trim().is_empty() {
                let _ = editor.add_history_entry(&line);
            }

            let line = parser::expand_self_pid(&line, shell_pid);
            self.execute_line(&line, &mut out)?;
            out.flush()?;
        }

        self.jobs.shutdown(&mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Dispatch one already-expanded input line.
    ///
    /// Builtins are matched by exact name before anything is spawned; every
    /// other first token is an external program invocation.
    pub fn execute_line(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        let Some(cmd) = parser::parse_line(line) else {
            return Ok(());
        };
        match cmd.program.as_str() {
            "exit" => self.env.should_exit = true,
            "cd" => {
                builtin::cd(&cmd.args, &mut self.env, out)?;
            }
            "status" => {
                builtin::status(&self.env, out)?;
            }
            _ => launcher::spawn(&cmd, &mut self.env, &mut self.jobs, out)?,
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(interp: &mut Interpreter, line: &str) -> String {
        let mut out = Vec::new();
        interp.execute_line(line, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn blank_and_comment_lines_produce_nothing() {
        let mut interp = Interpreter::new();
        assert_eq!(run(&mut interp, ""), "");
        assert_eq!(run(&mut interp, "   "), "");
        assert_eq!(run(&mut interp, "# just a note"), "");
    }

    #[test]
    fn status_follows_the_last_foreground_command() {
        let mut interp = Interpreter::new();
        assert_eq!(run(&mut interp, "status"), "exit value 0\n");

        run(&mut interp, "false");
        assert_eq!(run(&mut interp, "status"), "exit value 1\n");

        run(&mut interp, "true");
        assert_eq!(run(&mut interp, "status"), "exit value 0\n");
    }

    #[test]
    fn failed_redirection_shows_up_in_status() {
        let mut interp = Interpreter::new();
        run(&mut interp, "cat < /no/such/input/file");
        assert_eq!(run(&mut interp, "status"), "exit value 1\n");
    }

    #[test]
    fn exit_sets_the_loop_flag() {
        let mut interp = Interpreter::new();
        assert!(!interp.env.should_exit);
        run(&mut interp, "exit");
        assert!(interp.env.should_exit);
    }

    #[test]
    fn background_jobs_are_reaped_with_a_single_message() {
        let _guard = crate::signals::flag_lock();
        let mut interp = Interpreter::new();
        run(&mut interp, "true &");
        assert_eq!(interp.jobs.len(), 1);

        let mut captured = Vec::new();
        for _ in 0..500 {
            interp.jobs.reap_completed(&mut captured).unwrap();
            if interp.jobs.running() == 0 {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        let output = String::from_utf8(captured).unwrap();
        assert!(output.contains("is done: exit value 0"));
        assert_eq!(output.matches("is done").count(), 1);
    }
}
