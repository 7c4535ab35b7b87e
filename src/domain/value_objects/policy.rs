use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

/// Longest accepted window or retention: 100 years.
pub const MAX_HOURS: f64 = 876_600.0;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PolicyError {
    #[error("alert threshold must be at least 1")]
    ZeroThreshold,
    #[error("{0} must be a positive number of hours")]
    NonPositiveDuration(&'static str),
    #[error("{0} must not exceed 100 years")]
    DurationTooLong(&'static str),
}

/// Convert fractional hours into a `TimeDelta` with millisecond precision.
///
/// # Errors
///
/// Returns `PolicyError::NonPositiveDuration` for zero, negative, or non-finite
/// input and `PolicyError::DurationTooLong` above [`MAX_HOURS`].
#[allow(clippy::cast_possible_truncation)]
pub fn hours_to_delta(hours: f64, field: &'static str) -> Result<TimeDelta, PolicyError> {
    if !hours.is_finite() || hours <= 0.0 {
        return Err(PolicyError::NonPositiveDuration(field));
    }
    if hours > MAX_HOURS {
        return Err(PolicyError::DurationTooLong(field));
    }
    let millis = (hours * 3_600_000.0).round();
    if millis < 1.0 {
        return Err(PolicyError::NonPositiveDuration(field));
    }
    TimeDelta::try_milliseconds(millis as i64).ok_or(PolicyError::DurationTooLong(field))
}

/// `now - span`, clamped to the earliest representable instant.
#[must_use]
pub fn saturating_sub(now: DateTime<Utc>, span: TimeDelta) -> DateTime<Utc> {
    now.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// When repeated failures turn into an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPolicy {
    window: TimeDelta,
    threshold: u32,
}

impl AlertPolicy {
    /// # Errors
    ///
    /// Returns `PolicyError::ZeroThreshold` when `threshold` is 0.
    pub const fn new(window: TimeDelta, threshold: u32) -> Result<Self, PolicyError> {
        if threshold == 0 {
            return Err(PolicyError::ZeroThreshold);
        }
        Ok(Self { window, threshold })
    }

    /// # Errors
    ///
    /// Returns `PolicyError` if the window is not positive or the threshold is 0.
    pub fn from_hours(window_hours: f64, threshold: u32) -> Result<Self, PolicyError> {
        Self::new(hours_to_delta(window_hours, "alert window")?, threshold)
    }

    #[must_use]
    pub const fn window(&self) -> TimeDelta {
        self.window
    }

    #[must_use]
    pub const fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Oldest instant still inside the window ending at `now`.
    #[must_use]
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        saturating_sub(now, self.window)
    }

    #[must_use]
    pub fn should_alert(&self, failures: usize) -> bool {
        failures >= self.threshold as usize
    }
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            window: TimeDelta::hours(1),
            threshold: 3,
        }
    }
}

/// Age after which persisted events are deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    retention: TimeDelta,
}

impl RetentionPolicy {
    #[must_use]
    pub const fn new(retention: TimeDelta) -> Self {
        Self { retention }
    }

    /// # Errors
    ///
    /// Returns `PolicyError::NonPositiveDuration` if `hours` is not positive.
    pub fn from_hours(hours: f64) -> Result<Self, PolicyError> {
        Ok(Self::new(hours_to_delta(hours, "retention")?))
    }

    #[must_use]
    pub const fn retention(&self) -> TimeDelta {
        self.retention
    }

    /// Events strictly older than the returned instant are eligible for deletion.
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        saturating_sub(now, self.retention)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::new(TimeDelta::hours(24))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn zero_threshold_rejected() {
        assert_eq!(
            AlertPolicy::new(TimeDelta::hours(1), 0),
            Err(PolicyError::ZeroThreshold)
        );
    }

    #[test]
    fn fractional_hours_converted() {
        let policy = AlertPolicy::from_hours(0.5, 2).expect("policy");
        assert_eq!(policy.window(), TimeDelta::minutes(30));
    }

    #[test]
    fn non_positive_hours_rejected() {
        assert!(AlertPolicy::from_hours(0.0, 3).is_err());
        assert!(AlertPolicy::from_hours(-1.0, 3).is_err());
        assert!(RetentionPolicy::from_hours(f64::NAN).is_err());
    }

    #[test]
    fn should_alert_at_threshold() {
        let policy = AlertPolicy::new(TimeDelta::hours(1), 3).expect("policy");
        assert!(!policy.should_alert(2));
        assert!(policy.should_alert(3));
        assert!(policy.should_alert(4));
    }

    #[test]
    fn retention_cutoff() {
        let now = DateTime::parse_from_rfc3339("2025-01-02T00:00:00Z")
            .expect("parse")
            .with_timezone(&Utc);
        let policy = RetentionPolicy::from_hours(24.0).expect("policy");
        assert_eq!(policy.cutoff(now), now - TimeDelta::hours(24));
    }

    #[test]
    fn defaults_match_config_defaults() {
        let alert = AlertPolicy::default();
        assert_eq!(alert.window(), TimeDelta::hours(1));
        assert_eq!(alert.threshold(), 3);
        assert_eq!(RetentionPolicy::default().retention(), TimeDelta::hours(24));
    }

    #[test]
    fn durations_beyond_a_century_rejected() {
        assert_eq!(
            hours_to_delta(1e10, "alert window"),
            Err(PolicyError::DurationTooLong("alert window"))
        );
        assert!(RetentionPolicy::from_hours(1e10).is_err());
        assert!(AlertPolicy::from_hours(MAX_HOURS, 3).is_ok());
    }

    #[test]
    fn oversized_spans_clamp_instead_of_overflowing() {
        let now = Utc::now();
        let policy = AlertPolicy::new(TimeDelta::MAX, 1).expect("policy");
        assert_eq!(policy.window_start(now), DateTime::<Utc>::MIN_UTC);
        assert_eq!(
            RetentionPolicy::new(TimeDelta::MAX).cutoff(now),
            DateTime::<Utc>::MIN_UTC
        );
    }
}
