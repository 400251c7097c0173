use chrono::Utc;

/// Source of the `asof` timestamp stamped on every report.
pub trait Clock: Send + Sync {
    /// Current UTC time truncated to whole seconds, e.g. `2025-01-01T00:00:00Z`.
    fn now_utc_seconds(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc_seconds(&self) -> String {
        Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

/// Clock pinned to one timestamp, for golden outputs.
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl Clock for FixedClock {
    fn now_utc_seconds(&self) -> String {
        self.0.clone()
    }
}

/// Use `fixed_ts` verbatim when given, otherwise ask the clock.
pub fn resolve_asof(fixed_ts: Option<&str>, clock: &dyn Clock) -> String {
    match fixed_ts {
        Some(ts) => ts.to_string(),
        None => clock.now_utc_seconds(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Timelike};

    #[test]
    fn system_clock_emits_whole_seconds_with_z_suffix() {
        let stamp = SystemClock.now_utc_seconds();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), "2025-01-01T00:00:00Z".len());
        let parsed = DateTime::parse_from_rfc3339(&stamp).expect("rfc3339");
        assert_eq!(parsed.nanosecond(), 0);
    }

    #[test]
    fn fixed_timestamp_is_used_verbatim() {
        let clock = FixedClock("2030-06-01T12:00:00Z".to_string());
        assert_eq!(resolve_asof(Some("not-a-date"), &clock), "not-a-date");
        assert_eq!(resolve_asof(None, &clock), "2030-06-01T12:00:00Z");
    }
}
