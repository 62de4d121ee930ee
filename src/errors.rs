use thiserror::Error;

/// Unified error hierarchy for the announcer.
///
/// Everything in the `ImproperlyConfigured` / `Json` / `InvalidDuration` class is
/// detected before any registration or process spawn happens. `Transport` is fatal
/// only while the initial registration runs; after the child is spawned it degrades
/// to a logged warning.
#[derive(Debug, Error)]
pub enum Error {
    /// Structural or semantic configuration problem: missing "name", duplicate
    /// service ID, "services"/"checks" not an array, no services, undefined interval.
    #[error("improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// The configuration value is not valid JSON at all.
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A TTL value could not be parsed as a Go-style duration string.
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// The Consul agent could not be reached at all. An agent that answers with
    /// a non-2xx status is not a transport error; that is reported as `Ok(false)`.
    #[error("can't connect to Consul agent: {0}")]
    Transport(#[from] reqwest::Error),

    /// Config file read or child process spawn failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
