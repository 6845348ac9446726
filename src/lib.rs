//! A small interactive shell built around fork/exec process control.
//!
//! The crate's core is the process and job-control subsystem: spawning
//! external programs ([`launcher`]), signal-disposition management
//! ([`signals`]), `<`/`>` descriptor binding inside the child ([`redirect`]),
//! and non-blocking tracking of background children until they terminate
//! ([`jobs`]). Around that core sit the line parser, a couple of in-process
//! builtins (`cd`, `status`), and the prompt loop.
//!
//! The main entry point is [`Interpreter`], whose `repl` method runs the
//! whole session: it reaps finished background jobs before each prompt,
//! dispatches builtins by exact name, and forks everything else.

mod builtin;
pub mod command;
pub mod env;
mod interpreter;
pub mod jobs;
mod launcher;
mod parser;
pub mod redirect;
mod signals;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;
