//! Polling interval derivation.
//!
//! The keepalive cadence must stay comfortably under the smallest TTL or the agent
//! will flip checks to critical between renewals.

use indexmap::IndexMap;
use serde_json::Value;

use crate::config::CheckDefinition;
use crate::errors::Error;
use crate::utils::duration::parse_duration_seconds;

/// Outcome of interval resolution. `min_ttl` is kept so the caller can report a
/// user interval that outpaces the checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedInterval {
    pub seconds: f64,
    pub min_ttl: Option<f64>,
}

impl ResolvedInterval {
    /// `Some(min_ttl)` when the chosen interval is longer than the smallest TTL,
    /// i.e. checks may expire between renewals. A warning, not an error.
    pub fn exceeds_min_ttl(&self) -> Option<f64> {
        self.min_ttl.filter(|min| self.seconds > *min)
    }
}

/// Derive the polling interval from the TTL checks and an optional user override.
///
/// - no override: min TTL / 10 (fails when there are no TTL checks);
/// - override set: taken verbatim, flagged when it exceeds the min TTL.
pub fn resolve_interval(
    ttl_checks: &IndexMap<String, CheckDefinition>,
    user_interval: Option<f64>,
) -> Result<ResolvedInterval, Error> {
    let min_ttl = min_ttl(ttl_checks)?;
    tracing::debug!(
        "Min TTL is {}",
        min_ttl.map_or("not available".to_string(), |ttl| format!("{ttl} sec"))
    );

    let seconds = match (user_interval, min_ttl) {
        (Some(interval), _) => interval,
        (None, Some(min)) => {
            let interval = min / 10.0;
            tracing::debug!(
                "Polling interval is auto calculated as min TTL / 10 = {} sec",
                interval
            );
            interval
        }
        (None, None) => {
            return Err(Error::ImproperlyConfigured(
                "polling interval is undefined".into(),
            ))
        }
    };

    // The duration parser accepts negative totals (Go durations are signed), and
    // the user override is an arbitrary float. The loop can only sleep a finite,
    // positive amount.
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(Error::ImproperlyConfigured(format!(
            "polling interval must be a positive number of seconds, got {seconds:?}"
        )));
    }

    Ok(ResolvedInterval { seconds, min_ttl })
}

/// Smallest TTL across all TTL checks, in seconds; `None` when there are none.
fn min_ttl(ttl_checks: &IndexMap<String, CheckDefinition>) -> Result<Option<f64>, Error> {
    let mut min: Option<f64> = None;
    for check in ttl_checks.values() {
        let ttl = match check.ttl() {
            Some(Value::String(text)) => parse_duration_seconds(text)?,
            Some(other) => {
                return Err(Error::InvalidDuration(format!(
                    "duration must be a string: {other}"
                )))
            }
            // Checks are only indexed here when a "ttl" key is present.
            None => continue,
        };
        min = Some(min.map_or(ttl, |current| current.min(ttl)));
    }
    Ok(min)
}
