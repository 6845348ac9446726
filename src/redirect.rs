//! Redirection planning and binding.
//!
//! Planning — extracting `<`/`>` tokens and their target paths from a
//! command's argument sequence — is a pure scan over the arguments, so it can
//! run (and be tested) anywhere. Binding the resulting plan to descriptors 0
//! and 1 happens strictly inside the forked child before exec: each child
//! gets an independent copy of the descriptor table, so nothing here is ever
//! visible to the shell or to sibling children.

use std::os::fd::RawFd;
use std::path::Path;

use anyhow::{Result, anyhow, bail};
use nix::fcntl::{OFlag, open};
use nix::sys::stat::Mode;
use nix::unistd::{close, dup2};

const NULL_DEVICE: &str = "/dev/null";
const STDIN_FD: RawFd = nix::libc::STDIN_FILENO;
const STDOUT_FD: RawFd = nix::libc::STDOUT_FILENO;

/// Descriptor bindings extracted from one command's arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectionPlan {
    /// Path to bind to standard input, if `<` was present.
    pub stdin_path: Option<String>,
    /// Path to bind to standard output, if `>` was present.
    pub stdout_path: Option<String>,
    /// Program name plus the arguments that survive token stripping; this is
    /// the argv handed to exec.
    pub argv: Vec<String>,
}

/// Scan the argument sequence once, left to right.
///
/// `>` and `<` each consume the following argument as their target path, and
/// both words are dropped from the exec argv. A repeated token overwrites the
/// earlier binding (last one wins). A dangling token with no path to consume
/// is an error; the child reports it and exits with status 1.
pub fn plan(program: &str, args: &[String]) -> Result<RedirectionPlan> {
    let mut stdin_path = None;
    let mut stdout_path = None;
    let mut argv = vec![program.to_string()];

    let mut iter = args.iter();
    while let Some(token) = iter.next() {
        match token.as_str() {
            ">" => match iter.next() {
                Some(path) => stdout_path = Some(path.clone()),
                None => bail!("syntax error: `>` is missing a target path"),
            },
            "<" => match iter.next() {
                Some(path) => stdin_path = Some(path.clone()),
                None => bail!("syntax error: `<` is missing a target path"),
            },
            _ => argv.push(token.clone()),
        }
    }

    Ok(RedirectionPlan {
        stdin_path,
        stdout_path,
        argv,
    })
}

/// Bind the plan to descriptors 0 and 1. Child-side only.
///
/// A background command whose streams were not explicitly redirected gets
/// `/dev/null` instead: background output must not corrupt the interactive
/// session, and background input must not block on an absent terminal read.
/// Any failure here is fatal to the child alone; the caller prints the error
/// and exits with status 1.
pub fn apply(plan: &RedirectionPlan, background: bool) -> Result<()> {
    if let Some(path) = &plan.stdout_path {
        let fd = open(
            Path::new(path),
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            Mode::from_bits_truncate(0o660),
        )
        .map_err(|errno| anyhow!("{}: {}", path, errno.desc()))?;
        bind(fd, STDOUT_FD)?;
    } else if background {
        let fd = open(Path::new(NULL_DEVICE), OFlag::O_WRONLY, Mode::empty())
            .map_err(|errno| anyhow!("{}: {}", NULL_DEVICE, errno.desc()))?;
        bind(fd, STDOUT_FD)?;
    }

    if let Some(path) = &plan.stdin_path {
        let fd = open(Path::new(path), OFlag::O_RDONLY, Mode::empty())
            .map_err(|_| anyhow!("cannot open {} for input", path))?;
        bind(fd, STDIN_FD)?;
    } else if background {
        let fd = open(Path::new(NULL_DEVICE), OFlag::O_RDONLY, Mode::empty())
            .map_err(|errno| anyhow!("{}: {}", NULL_DEVICE, errno.desc()))?;
        bind(fd, STDIN_FD)?;
    }

    Ok(())
}

/// Duplicate `fd` onto the canonical stream descriptor, then close `fd` so
/// the stream number is the only reference left.
fn bind(fd: RawFd, stream: RawFd) -> Result<()> {
    let duplicated = dup2(fd, stream);
    let _ = close(fd);
    duplicated.map_err(|errno| anyhow!("dup2({}): {}", stream, errno.desc()))?;
    Ok(())
}
