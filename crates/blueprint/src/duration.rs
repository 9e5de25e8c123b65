//! Human duration strings (`5m`, `1h30m`, `90s`, `250ms`)

use crate::error::{Error, Result};
use std::time::Duration;

const SECS_PER_HOUR: u64 = 3600;

/// Parse a duration made of `<number><unit>` pairs, as `humantime` reads
/// them. A bare `0` is accepted.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let text = text.trim();
    if text == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(text).map_err(|e| Error::InvalidDuration {
        value: text.to_string(),
        message: e.to_string(),
    })
}

/// Format a duration compactly (`1h30m`, `5m`, `1s500ms`, `0s`).
///
/// Whole hours never roll over into days, so the text stays readable by
/// Flux.
pub fn format_duration(duration: Duration) -> String {
    let hours = duration.as_secs() / SECS_PER_HOUR;
    let rest = duration - Duration::from_secs(hours * SECS_PER_HOUR);

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if !rest.is_zero() || out.is_empty() {
        out.extend(
            humantime::format_duration(rest)
                .to_string()
                .split_whitespace(),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_units() {
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("90s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1h 30m 15s").unwrap(), Duration::from_secs(5415));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for text in ["", "10", "m5", "5 parsecs"] {
            let err = parse_duration(text).unwrap_err();
            assert!(
                matches!(&err, Error::InvalidDuration { value, .. } if value == text),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn test_format() {
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h30m");
        assert_eq!(format_duration(Duration::from_secs(300)), "5m");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
        assert_eq!(format_duration(Duration::from_secs(61)), "1m1s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1s500ms");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn test_format_keeps_hours_past_a_day() {
        assert_eq!(format_duration(Duration::from_secs(26 * 3600)), "26h");
        assert_eq!(format_duration(Duration::from_secs(25 * 3600 + 60)), "25h1m");
    }
}
