//! Child process supervision with transparent signal forwarding.
//!
//! The supervisor owns the one child process exclusively: nobody else signals,
//! reads or reaps it. Liveness is re-queried from the OS on every call, never
//! cached. Dropping the supervisor force-kills a still-running child, covering
//! teardown paths that never reach the orchestrator's own cleanup.

use std::process::ExitStatus;

use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::errors::Error;

/// The explicit set of forwardable signals. SIGKILL and SIGSTOP cannot be caught;
/// SIGCHLD stays with the supervisor (the runtime needs it to reap the child).
#[cfg(unix)]
fn forwarded_signals() -> Vec<(tokio::signal::unix::SignalKind, nix::sys::signal::Signal)> {
    use nix::sys::signal::Signal;
    use tokio::signal::unix::SignalKind;

    vec![
        (SignalKind::hangup(), Signal::SIGHUP),
        (SignalKind::interrupt(), Signal::SIGINT),
        (SignalKind::quit(), Signal::SIGQUIT),
        (SignalKind::pipe(), Signal::SIGPIPE),
        (SignalKind::alarm(), Signal::SIGALRM),
        (SignalKind::terminate(), Signal::SIGTERM),
        (SignalKind::user_defined1(), Signal::SIGUSR1),
        (SignalKind::user_defined2(), Signal::SIGUSR2),
        (SignalKind::io(), Signal::SIGIO),
        (SignalKind::window_change(), Signal::SIGWINCH),
    ]
}

pub struct Supervisor {
    child: Child,
    forwarders: Vec<JoinHandle<()>>,
}

impl Supervisor {
    /// Spawn the command and install the signal forwarders, so the child observes
    /// the same signal sequence the supervisor's process receives.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(cmd: &[String]) -> Result<Self, Error> {
        let (program, args) = cmd
            .split_first()
            .ok_or_else(|| Error::ImproperlyConfigured("command is empty".into()))?;

        tracing::info!("Starting process: {}", cmd.join(" "));
        let child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()?;

        let forwarders = match child.id() {
            Some(pid) => install_forwarders(pid as i32),
            // Exited before we could look: nothing to forward to.
            None => Vec::new(),
        };

        Ok(Self { child, forwarders })
    }

    /// Re-check the child's exit status. `Ok(None)` means still running.
    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// OS PID, `None` once the child has been reaped.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        for task in &self.forwarders {
            task.abort();
        }
        if let Ok(None) = self.child.try_wait() {
            tracing::info!("Killing the process {:?} (cleanup)", self.child.id());
            // kill_on_drop(true) delivers the actual SIGKILL when `child` drops.
        }
    }
}

/// One forwarder task per signal. A handler that cannot be installed (some signals
/// cannot be intercepted at all, or not outside the main thread) is skipped, never
/// a startup failure.
#[cfg(unix)]
fn install_forwarders(pid: i32) -> Vec<JoinHandle<()>> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let target = Pid::from_raw(pid);
    let mut tasks = Vec::new();

    for (kind, signal) in forwarded_signals() {
        let mut stream = match tokio::signal::unix::signal(kind) {
            Ok(stream) => stream,
            Err(err) => {
                tracing::debug!("Cannot install {} handler, skipping: {}", signal.as_str(), err);
                continue;
            }
        };
        tasks.push(tokio::spawn(async move {
            while stream.recv().await.is_some() {
                tracing::debug!("Forwarding {} to PID {}", signal.as_str(), target);
                if let Err(err) = kill(target, signal) {
                    tracing::warn!(
                        "Failed to forward {} to PID {}: {}",
                        signal.as_str(),
                        target,
                        err
                    );
                }
            }
        }));
    }

    tasks
}

#[cfg(not(unix))]
fn install_forwarders(_pid: i32) -> Vec<JoinHandle<()>> {
    Vec::new()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_set_excludes_uncatchable_signals() {
        use nix::sys::signal::Signal;

        let signals: Vec<_> = forwarded_signals()
            .into_iter()
            .map(|(_, signal)| signal)
            .collect();
        assert!(!signals.contains(&Signal::SIGKILL));
        assert!(!signals.contains(&Signal::SIGSTOP));
        assert!(!signals.contains(&Signal::SIGCHLD));
        assert!(signals.contains(&Signal::SIGTERM));
        assert!(signals.contains(&Signal::SIGHUP));
    }
}
