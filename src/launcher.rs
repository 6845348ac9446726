//! Forking and execing external commands.
//!
//! One child per command. The child applies signal policy and descriptor
//! bindings before replacing its image; the parent either blocks on the exact
//! pid (foreground) or registers it with the job table and returns to the
//! loop (background). Every failure a command can produce stays local to
//! that command: a fork error drops the command, a redirection or exec error
//! terminates the child with status 1, and the shell keeps running.

use std::ffi::CString;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use nix::sys::wait::{WaitPidFlag, waitpid};
use nix::unistd::{ForkResult, execvp, fork, getpid};

use crate::command::Command;
use crate::env::Environment;
use crate::jobs::{Disposition, JobTable};
use crate::{redirect, signals};

/// Pause after launching a background command so the child's startup line
/// reaches the terminal before the next prompt. An ordering aid only, not a
/// correctness guarantee.
const BACKGROUND_SETTLE: Duration = Duration::from_millis(100);

/// Spawn one child for `cmd` and handle the foreground/background split.
///
/// The command's background flag is honored only while foreground-only mode
/// is off. Foreground commands overwrite `env.last_status` once their wait
/// completes; background commands are registered in `jobs` immediately.
pub fn spawn(
    cmd: &Command,
    env: &mut Environment,
    jobs: &mut JobTable,
    out: &mut dyn Write,
) -> Result<()> {
    let background = cmd.background && !signals::is_foreground_only();

    // Nothing buffered may leak into the child's copy of the stream.
    out.flush()?;
    io::stdout().flush()?;

    match unsafe { fork() } {
        Err(errno) => {
            // Fork failure is never shell-fatal; report and drop the command.
            writeln!(out, "fork() failed: {}", errno.desc())?;
            Ok(())
        }
        Ok(ForkResult::Child) => run_child(cmd, background),
        Ok(ForkResult::Parent { child }) => {
            if background {
                // One non-blocking poll; the job is registered regardless of
                // its outcome. If the poll wins the race against a fast
                // child, the termination is recorded so the next sweep still
                // emits the completion line.
                let early = waitpid(child, Some(WaitPidFlag::WNOHANG))
                    .ok()
                    .and_then(Disposition::from_wait_status);
                jobs.register(child);
                if let Some(disposition) = early {
                    jobs.note_early_termination(child, disposition);
                }
                thread::sleep(BACKGROUND_SETTLE);
            } else {
                match waitpid(child, None) {
                    Ok(status) => {
                        if let Some(disposition) = Disposition::from_wait_status(status) {
                            if let Disposition::Signaled(_) = disposition {
                                writeln!(out, "{}", disposition)?;
                            }
                            env.last_status = disposition.to_string();
                        }
                    }
                    Err(_) => {
                        // The child is gone and unobservable; keep the
                        // previous status rather than invent one.
                    }
                }
            }
            Ok(())
        }
    }
}

/// Child side of the fork: signal policy, redirection, exec. Never returns.
///
/// All child output goes through raw `write(2)`: the forked child inherits
/// the parent's stream state, including any lock another thread held at fork
/// time, so the buffered handle cannot be trusted here.
fn run_child(cmd: &Command, background: bool) -> ! {
    signals::apply_child_dispositions(!background);

    if background {
        raw_write(&format!("background pid is {}\n", getpid()));
    }

    let plan = match redirect::plan(&cmd.program, &cmd.args) {
        Ok(plan) => plan,
        Err(err) => child_fail(&err.to_string()),
    };
    if let Err(err) = redirect::apply(&plan, background) {
        child_fail(&err.to_string());
    }

    let argv: Vec<CString> = match plan
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect()
    {
        Ok(argv) => argv,
        Err(_) => child_fail(&format!("{}: invalid argument", cmd.program)),
    };

    match execvp(&argv[0], &argv) {
        Ok(never) => match never {},
        Err(errno) => child_fail(&format!("{}: {}", cmd.program, errno.desc())),
    }
}

/// Report a child-local failure on the interactive stream and terminate the
/// child with status 1. The shell process is unaffected.
fn child_fail(message: &str) -> ! {
    raw_write(&format!("{}\n", message));
    unsafe { nix::libc::_exit(1) }
}

fn raw_write(message: &str) {
    unsafe {
        nix::libc::write(
            nix::libc::STDOUT_FILENO,
            message.as_ptr().cast(),
            message.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn launch(program: &str, args: &[&str], background: bool) -> (Environment, JobTable, String) {
        let mut env = Environment::new();
        let mut jobs = JobTable::new();
        let mut out = Vec::new();
        let cmd = Command::new(
            program,
            args.iter().map(|a| a.to_string()).collect(),
            background,
        );
        spawn(&cmd, &mut env, &mut jobs, &mut out).unwrap();
        (env, jobs, String::from_utf8(out).unwrap())
    }

    #[test]
    fn foreground_success_records_exit_value_zero() {
        let (env, jobs, out) = launch("true", &[], false);
        assert_eq!(env.last_status, "exit value 0");
        assert_eq!(jobs.len(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn foreground_failure_records_exit_value_one() {
        let (env, _, _) = launch("false", &[], false);
        assert_eq!(env.last_status, "exit value 1");
    }

    #[test]
    fn missing_program_fails_in_the_child_only() {
        let (env, _, _) = launch("definitely-not-a-real-program", &[], false);
        assert_eq!(env.last_status, "exit value 1");
    }

    #[test]
    fn signaled_foreground_command_is_reported_immediately() {
        // The inner shell kills itself; $$ here is expanded by sh, not us.
        let (env, _, out) = launch("sh", &["-c", "kill -9 $$"], false);
        assert_eq!(env.last_status, "terminated by signal 9");
        assert_eq!(out, "terminated by signal 9\n");
    }

    #[test]
    fn redirection_round_trip_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");

        let (env, _, _) = launch(
            "echo",
            &["deterministic content", ">", first.to_str().unwrap()],
            false,
        );
        assert_eq!(env.last_status, "exit value 0");
        assert_eq!(
            fs::read_to_string(&first).unwrap(),
            "deterministic content\n"
        );

        // Read it back through input redirection and write it out again.
        let (env, _, _) = launch(
            "cat",
            &["<", first.to_str().unwrap(), ">", second.to_str().unwrap()],
            false,
        );
        assert_eq!(env.last_status, "exit value 0");
        assert_eq!(
            fs::read_to_string(&second).unwrap(),
            fs::read_to_string(&first).unwrap()
        );
    }

    #[test]
    fn input_redirection_from_missing_path_exits_one() {
        let (env, _, _) = launch("cat", &["<", "/no/such/file/anywhere"], false);
        assert_eq!(env.last_status, "exit value 1");
    }

    #[test]
    fn background_command_is_registered_not_waited() {
        let _guard = signals::flag_lock();
        let (env, mut jobs, _) = launch("sleep", &["30"], true);
        // Control came back without waiting on the child.
        assert_eq!(env.last_status, "exit value 0");
        assert_eq!(jobs.running(), 1);

        let mut drained = Vec::new();
        jobs.shutdown(&mut drained).unwrap();
        assert_eq!(jobs.running(), 0);
    }

    #[test]
    fn background_streams_fall_back_to_the_null_device() {
        let _guard = signals::flag_lock();
        // Without the stdin fallback, cat would sit blocked on the
        // inherited terminal instead of hitting EOF and exiting.
        let (_, mut jobs, _) = launch("cat", &[], true);
        assert_eq!(jobs.running(), 1);

        let mut captured = Vec::new();
        for _ in 0..500 {
            jobs.reap_completed(&mut captured).unwrap();
            if jobs.running() == 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(jobs.running(), 0);

        let output = String::from_utf8(captured).unwrap();
        assert!(output.contains("is done: exit value 0"));
        assert_eq!(output.matches("is done").count(), 1);
    }

    #[test]
    fn foreground_only_mode_downgrades_background_commands() {
        let _guard = signals::flag_lock();
        signals::set_foreground_only(true);
        let (env, jobs, _) = launch("false", &[], true);
        signals::set_foreground_only(false);

        // Ran in the foreground: nothing registered, status overwritten.
        assert_eq!(jobs.len(), 0);
        assert_eq!(env.last_status, "exit value 1");
    }
}
