//! Exponential backoff with jitter, capped at 10 seconds.
//!
//! Pure function of attempt index + optional remaining budget. The
//! random component is injected through a trait the same way
//! `jhol-core`'s transport layer separates pure accounting from IO --
//! here it lets tests substitute a deterministic source.

use std::time::Duration;

const MAX_SLEEP: Duration = Duration::from_secs(10);

/// Source of randomness for jitter. Production code uses `DefaultRng`
/// (backed by the `rand` crate); tests substitute a fixed source.
pub trait RngSource {
    /// Returns a value in `[0.0, 1.0)`.
    fn next_unit(&mut self) -> f64;
}

/// `rand`-backed source used outside of tests.
#[derive(Default)]
pub struct DefaultRng;

impl RngSource for DefaultRng {
    fn next_unit(&mut self) -> f64 {
        rand::random::<f64>()
    }
}

/// How long to sleep before retrying `attempt` (zero-based), given an
/// optional remaining wall-clock budget.
///
/// `sleep_duration(attempt, max_remaining) = min(10s, max_remaining,
/// uniform(0,1.5) + 1.5^(attempt.max(1) - 1))`. Always returns more than
/// 100ms unless `max_remaining` forces less.
pub fn sleep_duration(attempt: u32, max_remaining: Option<Duration>) -> Duration {
    sleep_duration_with(&mut DefaultRng, attempt, max_remaining)
}

pub fn sleep_duration_with(
    rng: &mut dyn RngSource,
    attempt: u32,
    max_remaining: Option<Duration>,
) -> Duration {
    let attempt = attempt.max(1);
    let base = 1.5f64.powi(attempt as i32 - 1);
    let jitter = rng.next_unit() * 1.5;
    let mut seconds = base + jitter;
    seconds = seconds.min(MAX_SLEEP.as_secs_f64());
    let mut duration = Duration::from_secs_f64(seconds.max(0.0));
    if let Some(max_remaining) = max_remaining {
        duration = duration.min(max_remaining);
    }
    duration
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRng(f64);
    impl RngSource for FixedRng {
        fn next_unit(&mut self) -> f64 {
            self.0
        }
    }

    #[test]
    fn bounded_above_by_ten_seconds() {
        let mut rng = FixedRng(0.999);
        for attempt in 1..20 {
            let d = sleep_duration_with(&mut rng, attempt, None);
            assert!(d <= MAX_SLEEP);
        }
    }

    #[test]
    fn bounded_below_without_tight_budget() {
        let mut rng = FixedRng(0.0);
        let d = sleep_duration_with(&mut rng, 1, None);
        assert!(d > Duration::from_millis(100));
    }

    #[test]
    fn respects_remaining_budget() {
        let mut rng = FixedRng(0.999);
        let d = sleep_duration_with(&mut rng, 5, Some(Duration::from_millis(50)));
        assert_eq!(d, Duration::from_millis(50));
    }

    #[test]
    fn attempt_zero_treated_as_one() {
        let mut rng = FixedRng(0.3);
        let d0 = sleep_duration_with(&mut rng, 0, None);
        let mut rng = FixedRng(0.3);
        let d1 = sleep_duration_with(&mut rng, 1, None);
        assert_eq!(d0, d1);
    }

    #[test]
    fn grows_with_attempt() {
        let mut rng = FixedRng(0.0);
        let d1 = sleep_duration_with(&mut rng, 1, None);
        let mut rng = FixedRng(0.0);
        let d2 = sleep_duration_with(&mut rng, 3, None);
        assert!(d2 > d1);
    }
}
