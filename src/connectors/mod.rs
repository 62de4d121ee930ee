//! Consul agent connector module
//!
//! Provides the abstraction the orchestrator talks through, so tests can swap the
//! real HTTP client for a recording double.

use async_trait::async_trait;

use crate::config::ServiceDefinition;
use crate::errors::Error;

pub mod consul;

pub use consul::ConsulClient;

/// Boundary contract with the discovery agent. Every operation is best-effort and
/// independently failable:
///
/// - `Ok(true)`: the agent accepted the request;
/// - `Ok(false)`: the agent rejected it (non-2xx); callers log a warning and move on;
/// - `Err(Error::Transport)`: the agent could not be reached at all.
#[async_trait]
pub trait AgentConnector: Send + Sync {
    /// Submit the service's full raw definition, unmodified.
    async fn register(&self, service: &ServiceDefinition) -> Result<bool, Error>;

    /// Remove a service (and its checks) by ID.
    async fn deregister(&self, service_id: &str) -> Result<bool, Error>;

    /// Mark a TTL check as passing for another TTL window.
    async fn pass_ttl_check(&self, check_id: &str) -> Result<bool, Error>;
}
