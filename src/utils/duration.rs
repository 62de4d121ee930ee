//! Go-style duration strings, as Consul uses for TTL values.
//!
//! See https://golang.org/pkg/time/#ParseDuration.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::Error;

/// One microsecond per unit, the resolution of the accumulated total.
const UNITS: &[(&str, f64)] = &[
    ("ns", 1e-3),
    ("us", 1.0),
    ("µs", 1.0),
    ("ms", 1e3),
    ("s", 1e6),
    ("m", 60.0 * 1e6),
    ("h", 60.0 * 60.0 * 1e6),
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+(?:\.\d*)?)([numµ]?s|[mh])").expect("valid regex"))
}

/// Parse a Go duration string (e.g. `"2h 1m 15s"`, `"631µs"`) into a signed
/// microsecond count.
///
/// The text is scanned left to right for `(number)(unit)` tokens; fragments that
/// don't match are skipped, so descriptive text around the numbers is tolerated.
/// A leading `-` negates the whole total. Sub-microsecond remainders truncate
/// toward zero. A string with no recognizable token at all is an error.
pub fn parse_duration(text: &str) -> Result<i64, Error> {
    let mut total_microseconds = 0f64;
    let mut matched = false;

    for token in token_pattern().captures_iter(text) {
        let value: f64 = token[1]
            .parse()
            .map_err(|_| Error::InvalidDuration(text.to_string()))?;
        let multiplier = UNITS
            .iter()
            .find(|(unit, _)| *unit == &token[2])
            .map(|(_, multiplier)| *multiplier)
            .ok_or_else(|| Error::InvalidDuration(text.to_string()))?;
        total_microseconds += value * multiplier;
        matched = true;
    }

    if !matched {
        return Err(Error::InvalidDuration(text.to_string()));
    }

    let sign = if text.starts_with('-') { -1.0 } else { 1.0 };
    Ok((sign * total_microseconds) as i64)
}

/// Same total expressed in seconds, the unit the polling interval works in.
pub fn parse_duration_seconds(text: &str) -> Result<f64, Error> {
    Ok(parse_duration(text)? as f64 / 1e6)
}
