//! Builtin commands executed in-process, without spawning a child.
//!
//! Dispatch is an exact match on the first token in the interpreter loop;
//! `exit` is intercepted there as well because it has to drain the job table
//! and stop the loop. Builtin failures never touch the last foreground
//! status — that slot belongs to spawned commands alone.

use std::env as stdenv;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use crate::command::ExitCode;
use crate::env::Environment;

/// `cd [path|~|-|.|..]` — change the working directory.
///
/// With no argument or `~`, goes to `$HOME`. `-` returns to the previous
/// directory and prints the new one. Anything else (including `.` and `..`)
/// is handed to the OS as-is.
pub fn cd(args: &[String], env: &mut Environment, out: &mut dyn Write) -> Result<ExitCode> {
    let target = match args.first().map(String::as_str) {
        None | Some("~") => match env.get_var("HOME") {
            Some(home) => PathBuf::from(home),
            None => {
                writeln!(out, "cd: HOME not set")?;
                return Ok(1);
            }
        },
        Some("-") => match env.previous_dir.clone() {
            Some(previous) => previous,
            None => {
                writeln!(out, "cd: previous directory not set")?;
                return Ok(1);
            }
        },
        Some(path) => PathBuf::from(path),
    };
    let announce = args.first().map(String::as_str) == Some("-");

    let leaving = stdenv::current_dir().unwrap_or_else(|_| env.current_dir.clone());
    if stdenv::set_current_dir(&target).is_err() {
        writeln!(
            out,
            "cd: {}: No such file or directory",
            target.display()
        )?;
        return Ok(1);
    }

    env.previous_dir = Some(leaving);
    env.current_dir = stdenv::current_dir().unwrap_or(target);
    if announce {
        writeln!(out, "{}", env.current_dir.display())?;
    }
    Ok(0)
}

/// `status` — print the disposition of the last foreground command.
pub fn status(env: &Environment, out: &mut dyn Write) -> Result<ExitCode> {
    writeln!(out, "{}", env.last_status)?;
    Ok(0)
}
