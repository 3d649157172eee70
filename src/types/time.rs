//! Protobuf JSON duration and timestamp helpers.

use crate::{Error, ErrorContext, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

/// Format as the protobuf JSON duration form, e.g. `"3600s"` or `"1.5s"`.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.subsec_nanos();
    if nanos == 0 {
        format!("{}s", d.as_secs())
    } else {
        let frac = format!("{:09}", nanos);
        format!("{}.{}s", d.as_secs(), frac.trim_end_matches('0'))
    }
}

pub fn parse_duration(raw: &str) -> Result<Duration> {
    let invalid = || {
        Error::validation_with_context(
            format!("'{}' is not a valid duration", raw),
            ErrorContext::new().with_details("expected seconds with an 's' suffix, e.g. \"3600s\""),
        )
    };
    let body = raw.trim().strip_suffix('s').ok_or_else(invalid)?;
    let secs: f64 = body.parse().map_err(|_| invalid())?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(invalid());
    }
    Duration::try_from_secs_f64(secs).map_err(|_| invalid())
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::validation(format!("'{}' is not an RFC 3339 timestamp: {}", raw, e)))
}

pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}
