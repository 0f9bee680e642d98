//! Polling schedule used while waiting for the server to come up.

use std::time::Duration;

/// Geometric back-off: each delay is 1.25 times the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartSchedule {
    initial: Duration,
    attempts: u32,
}

impl StartSchedule {
    /// First sleep before probing.
    pub const DEFAULT_INITIAL: Duration = Duration::from_millis(100);
    /// Probes before giving up; roughly 67 seconds in total.
    pub const DEFAULT_ATTEMPTS: u32 = 23;

    /// Builds a schedule starting at `initial` with `attempts` probes.
    #[must_use]
    pub const fn new(initial: Duration, attempts: u32) -> Self {
        Self { initial, attempts }
    }

    /// Number of probes.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Sleep before each probe, in order.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let mut next = self.initial;
        (0..self.attempts).map(move |_| {
            let delay = next;
            next = next.checked_mul(5).map_or(Duration::MAX, |scaled| scaled / 4);
            delay
        })
    }

    /// Sum of every delay.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.delays().sum()
    }
}

impl Default for StartSchedule {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INITIAL, Self::DEFAULT_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn default_schedule_grows_geometrically() {
        let delays: Vec<_> = StartSchedule::default().delays().take(3).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(125),
                Duration::from_nanos(156_250_000),
            ]
        );
    }

    #[rstest]
    fn default_schedule_allows_about_67_seconds() {
        let schedule = StartSchedule::default();
        assert_eq!(schedule.delays().count(), 23);
        let total = schedule.total().as_secs_f64();
        assert!((67.0..68.0).contains(&total), "total was {total}");
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5)]
    fn delay_count_matches_attempts(#[case] attempts: u32) {
        let schedule = StartSchedule::new(Duration::from_millis(1), attempts);
        assert_eq!(schedule.delays().count(), attempts as usize);
    }
}
