//! Background job tracking and reaping.
//!
//! The table is an append-only log: entries are tombstoned in place, never
//! removed, so insertion order doubles as a record of every background job
//! launched during the session. After a job is reaped its pid field is
//! replaced with a sentinel — the OS may hand the same pid to a later
//! process, and a stale entry must never match it.

use std::fmt;
use std::io::Write;

use anyhow::Result;
use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;

/// Sentinel written over a reaped job's pid.
const REAPED_PID: i32 = -1;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Normal exit with the given code.
    Exited(i32),
    /// Terminated by the given signal number.
    Signaled(i32),
}

impl Disposition {
    /// Decode a wait status into a disposition, if it describes termination.
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Disposition::Exited(code)),
            WaitStatus::Signaled(_, signal, _) => Some(Disposition::Signaled(signal as i32)),
            _ => None,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Exited(code) => write!(f, "exit value {}", code),
            Disposition::Signaled(signal) => write!(f, "terminated by signal {}", signal),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Reaped,
}

/// Tracking record for one background process.
#[derive(Debug)]
pub struct Job {
    pid: Pid,
    state: JobState,
    disposition: Option<Disposition>,
}

impl Job {
    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn disposition(&self) -> Option<Disposition> {
        self.disposition
    }
}

/// Ordered registry of background jobs.
///
/// Mutated only by the single shell thread; the only concurrency it observes
/// is process-level, through non-blocking waits.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a freshly launched background job.
    pub fn register(&mut self, pid: Pid) {
        self.jobs.push(Job {
            pid,
            state: JobState::Running,
            disposition: None,
        });
    }

    /// Number of entries ever registered (tombstones included).
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of jobs still running.
    pub fn running(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.state == JobState::Running)
            .count()
    }

    /// Record a termination observed before the job's first sweep.
    ///
    /// The launcher's post-spawn poll can win the race against a fast
    /// child; without this the sweep would find nothing left to wait on
    /// and the completion line would be lost.
    pub fn note_early_termination(&mut self, pid: Pid, disposition: Disposition) {
        if let Some(job) = self
            .jobs
            .iter_mut()
            .find(|job| job.state == JobState::Running && job.pid == pid)
        {
            job.disposition = Some(disposition);
        }
    }

    /// Non-blocking sweep over every running job, invoked once per
    /// interpreter iteration before the prompt is shown.
    ///
    /// Each terminated job gets exactly one completion line, its disposition
    /// recorded, and its pid tombstoned. A wait error means the job can no
    /// longer be observed at all; it is tombstoned without a message.
    pub fn reap_completed(&mut self, out: &mut dyn Write) -> Result<()> {
        for job in &mut self.jobs {
            if job.state != JobState::Running {
                continue;
            }
            // A termination already seen by the post-spawn poll still gets
            // its one completion line here.
            if let Some(disposition) = job.disposition {
                writeln!(
                    out,
                    "background pid {} is done: {}",
                    job.pid, disposition
                )?;
                tombstone(job, Some(disposition));
                continue;
            }
            match waitpid(job.pid, Some(WaitPidFlag::WNOHANG)) {
                Ok(WaitStatus::StillAlive) => {}
                Ok(status) => {
                    if let Some(disposition) = Disposition::from_wait_status(status) {
                        writeln!(
                            out,
                            "background pid {} is done: {}",
                            job.pid, disposition
                        )?;
                        tombstone(job, Some(disposition));
                    }
                    // Stopped/continued children stay registered as running.
                }
                Err(_) => tombstone(job, None),
            }
        }
        Ok(())
    }

    /// Kill and reap every job still running. Called once, on the exit path.
    ///
    /// The blocking wait guarantees no descendant survives the shell. Wait
    /// errors are best-effort: the job is still reported and tombstoned.
    pub fn shutdown(&mut self, out: &mut dyn Write) -> Result<()> {
        for job in &mut self.jobs {
            if job.state != JobState::Running {
                continue;
            }
            let _ = kill(job.pid, Signal::SIGTERM);
            let disposition = match waitpid(job.pid, None) {
                Ok(status) => Disposition::from_wait_status(status),
                Err(_) => None,
            };
            writeln!(out, "pid {} killed and reaped", job.pid)?;
            tombstone(job, disposition);
        }
        Ok(())
    }
}

fn tombstone(job: &mut Job, disposition: Option<Disposition>) {
    job.state = JobState::Reaped;
    job.disposition = disposition;
    job.pid = Pid::from_raw(REAPED_PID);
}
