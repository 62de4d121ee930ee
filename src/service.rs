//! Lifecycle orchestration: register services, spawn the child, keep TTL checks
//! alive while it runs, deregister on the way out.
//!
//! Deregistration is guaranteed on every exit path once registration has started:
//! normal child exit, an error raised mid-run, or the run future being dropped
//! part-way. In that last case the still-running child is force-killed by the
//! supervisor's own drop path, without deregistration.

use std::process::ExitStatus;
use std::time::Duration;

use crate::config::{load_config, ConfigModel};
use crate::connectors::AgentConnector;
use crate::errors::Error;
use crate::interval::resolve_interval;
use crate::supervisor::Supervisor;

/// User interval applied when the caller never chooses one at all. Distinct from
/// an explicit `None`, which asks for auto-derivation (min TTL / 10).
pub const DEFAULT_USER_INTERVAL: f64 = 1.0;

pub struct Service {
    agent: Box<dyn AgentConnector>,
    cmd: Vec<String>,
    config: ConfigModel,
    interval: f64,
    supervisor: Option<Supervisor>,
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("cmd", &self.cmd)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

pub struct ServiceBuilder {
    agent: Box<dyn AgentConnector>,
    config_source: String,
    cmd: Vec<String>,
    interval: Option<Option<f64>>,
}

impl ServiceBuilder {
    /// Explicit polling interval in seconds. `Some(None)` semantics via the
    /// argument: pass `None` to auto-derive from the smallest TTL.
    pub fn interval(mut self, interval: Option<f64>) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Parse and validate the configuration and resolve the polling interval.
    /// Fails before any network or process action.
    pub fn build(self) -> Result<Service, Error> {
        tracing::info!("Initializing service");

        let raw = load_config(&self.config_source)?;
        let config = ConfigModel::parse(&raw)?;

        let user_interval = self.interval.unwrap_or(Some(DEFAULT_USER_INTERVAL));
        let resolved = resolve_interval(config.ttl_checks(), user_interval)?;
        if let Some(min_ttl) = resolved.exceeds_min_ttl() {
            tracing::warn!(
                "Polling interval ({:?} sec) is greater than min TTL ({:?} sec)",
                resolved.seconds,
                min_ttl
            );
        }

        Ok(Service {
            agent: self.agent,
            cmd: self.cmd,
            config,
            interval: resolved.seconds,
            supervisor: None,
        })
    }
}

impl Service {
    pub fn builder(
        agent: Box<dyn AgentConnector>,
        config_source: impl Into<String>,
        cmd: Vec<String>,
    ) -> ServiceBuilder {
        ServiceBuilder {
            agent,
            config_source: config_source.into(),
            cmd,
            interval: None,
        }
    }

    /// Run the full lifecycle:
    ///
    /// - register services & checks with the agent
    /// - spawn the child process
    /// - poll it, renewing TTL checks while it lives
    /// - deregister services after the child is finished
    ///
    /// Returns the child's exit status. Deregistration runs regardless of what
    /// the earlier stages returned.
    pub async fn run(&mut self) -> Result<ExitStatus, Error> {
        let outcome = self.announce().await;
        self.deregister_services().await;
        outcome
    }

    async fn announce(&mut self) -> Result<ExitStatus, Error> {
        self.register_services().await?;
        let supervisor = Supervisor::spawn(&self.cmd)?;
        self.supervisor = Some(supervisor);
        self.poll().await
    }

    /// Register every service, passing its raw definition through unmodified.
    /// A rejection by the agent is a warning. Failing to reach the agent at all is
    /// fatal: the sidecar has no purpose if the agent is down at boot.
    async fn register_services(&self) -> Result<(), Error> {
        tracing::info!("Registering Consul services");
        for (service_id, service) in self.config.services() {
            tracing::debug!("Registering service \"{}\"", service_id);
            if !self.agent.register(service).await? {
                tracing::warn!("Service \"{}\" was not registered", service_id);
            }
        }
        Ok(())
    }

    /// The keepalive loop: sleep one interval, re-check liveness, renew TTL checks
    /// while the child is alive, stop when it has exited.
    async fn poll(&mut self) -> Result<ExitStatus, Error> {
        let cadence = Duration::from_secs_f64(self.interval);
        tracing::info!(
            "Start polling the process with PID {:?} every {} sec",
            self.child_id(),
            self.interval
        );

        loop {
            tokio::time::sleep(cadence).await;
            let status = self
                .supervisor
                .as_mut()
                .expect("process is spawned before polling")
                .try_wait()?;
            match status {
                None => self.pass_ttl_checks().await,
                Some(status) => {
                    tracing::info!("Process exited with {}", status);
                    return Ok(status);
                }
            }
        }
    }

    /// Renew every TTL check independently; failures are observational only and
    /// never retried out-of-band or allowed to touch the child.
    async fn pass_ttl_checks(&self) {
        if self.config.ttl_checks().is_empty() {
            tracing::debug!("No TTL checks registered");
            return;
        }

        let mut statuses = Vec::with_capacity(self.config.ttl_checks().len());
        for check_id in self.config.ttl_checks().keys() {
            let passed = match self.agent.pass_ttl_check(check_id).await {
                Ok(passed) => passed,
                Err(err) => {
                    tracing::warn!("TTL check \"{}\" renewal failed: {}", check_id, err);
                    false
                }
            };
            statuses.push(format!(
                "\"{}\" - {}",
                check_id,
                if passed { "passed" } else { "failed" }
            ));
        }
        tracing::debug!("Updating TTL checks: {}", statuses.join(", "));
    }

    /// Best-effort deregistration of every service, exactly one attempt each.
    /// Nothing here is fatal; the run is already over.
    async fn deregister_services(&self) {
        tracing::info!("Deregistering Consul services");
        for service_id in self.config.services().keys() {
            tracing::debug!("Deregistering service \"{}\"", service_id);
            match self.agent.deregister(service_id).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!("Service \"{}\" was not deregistered", service_id),
                Err(err) => {
                    tracing::warn!("Service \"{}\" was not deregistered: {}", service_id, err)
                }
            }
        }
    }

    pub fn config(&self) -> &ConfigModel {
        &self.config
    }

    /// Resolved polling interval in seconds.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// PID of the supervised child, once spawned and while not yet reaped.
    pub fn child_id(&self) -> Option<u32> {
        self.supervisor.as_ref().and_then(Supervisor::id)
    }
}
