//! Retry controller.
//!
//! Produces a lazy sequence of attempt descriptors, terminating on
//! attempt-count or wall-clock budget exhaustion. Not a plain
//! `std::iter::Iterator` -- the caller must feed back whether to skip
//! the inter-attempt sleep before asking for the next attempt, and
//! `Iterator::next()` takes no arguments, so this exposes its own
//! `next(&mut self, skip_sleep: bool)` method instead (documented
//! deviation from the idiomatic-iterator default).

use std::time::{Duration, Instant};

use crate::backoff::{self, RngSource};

/// Information about the current attempt, handed back by
/// `RetryController::next`.
#[derive(Debug, Clone, Copy)]
pub struct RetryAttempt {
    /// Zero-based attempt index.
    pub attempt: u32,
    /// Remaining wall-clock budget, if a timeout was configured.
    pub remaining: Option<Duration>,
}

pub struct RetryController {
    max_attempts: Option<u32>,
    timeout: Option<Duration>,
    start: Instant,
    next_attempt: u32,
    rng: Box<dyn RngSource + Send>,
}

impl RetryController {
    pub fn new(max_attempts: Option<u32>, timeout: Option<Duration>) -> Self {
        Self::with_rng(max_attempts, timeout, Box::new(backoff::DefaultRng))
    }

    pub fn with_rng(
        max_attempts: Option<u32>,
        timeout: Option<Duration>,
        rng: Box<dyn RngSource + Send>,
    ) -> Self {
        Self {
            max_attempts,
            timeout,
            start: Instant::now(),
            next_attempt: 0,
            rng,
        }
    }

    /// Remaining budget as a signed quantity: negative means the budget
    /// has been overrun (distinct from exactly zero, which is still
    /// within budget -- see the "retry once more after a successful
    /// opportunistic re-auth even with zero remaining" note on
    /// `HttpService::request`).
    fn remaining_signed(&self) -> Option<f64> {
        self.timeout
            .map(|t| t.as_secs_f64() - self.start.elapsed().as_secs_f64())
    }

    fn remaining(&self) -> Option<Duration> {
        self.remaining_signed()
            .map(|r| Duration::from_secs_f64(r.max(0.0)))
    }

    fn budget_overrun(&self) -> bool {
        matches!(self.remaining_signed(), Some(r) if r < 0.0)
    }

    /// Advances to the next attempt.
    ///
    /// `skip_sleep` must reflect whether the *previous* attempt asked to
    /// skip the inter-attempt sleep (e.g. after a successful
    /// opportunistic re-auth). The very first attempt never sleeps
    /// first, regardless of this flag.
    pub fn next(&mut self, skip_sleep: bool) -> Option<RetryAttempt> {
        let attempt = self.next_attempt;
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }
        if attempt > 0 && self.budget_overrun() {
            return None;
        }

        if attempt > 0 && !skip_sleep {
            if self.budget_overrun() {
                return None;
            }
            let sleep_for =
                backoff::sleep_duration_with(self.rng.as_mut(), attempt, self.remaining());
            std::thread::sleep(sleep_for);
        }

        self.next_attempt += 1;
        Some(RetryAttempt {
            attempt,
            remaining: self.remaining(),
        })
    }
}
