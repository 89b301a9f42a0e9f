//! Process-wide login attempt budget.
//!
//! Flow Overview:
//! 1) Every login attempt passes the gate once, before credentials are checked.
//! 2) While budget remains, the attempt is admitted and charged one unit, even if
//!    verification later fails.
//! 3) Once the budget is exhausted, attempts are rejected without being charged and
//!    each rejection rolls a 1-in-5 chance of refilling the budget to its ceiling.
//!
//! The counter is a single atomic so concurrent attempts can never push it below zero.

use rand::Rng;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

pub const DEFAULT_LOGIN_RATE_LIMIT: i64 = 10;

/// Exclusive upper bound of the reset draw.
const RESET_DRAW_BOUND: u32 = 5;
/// Draw value that refills the budget.
const RESET_SENTINEL: u32 = 3;

/// Source of the uniform draw used to decide probabilistic resets.
pub trait ResetDraw: Send + Sync {
    /// Return a uniform integer in `[0, upper)`.
    fn draw(&self, upper: u32) -> u32;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRngDraw;

impl ResetDraw for ThreadRngDraw {
    fn draw(&self, upper: u32) -> u32 {
        rand::thread_rng().gen_range(0..upper)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

/// Result of passing the gate, with the budget as it stood once this attempt was
/// accounted for. Used to render the rate-limit headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub decision: RateLimitDecision,
    pub ceiling: i64,
    pub remaining: i64,
}

impl RateLimitSnapshot {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.decision == RateLimitDecision::Allowed
    }
}

pub struct LoginRateLimiter {
    ceiling: i64,
    remaining: AtomicI64,
    draw: Box<dyn ResetDraw>,
}

impl std::fmt::Debug for LoginRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRateLimiter")
            .field("ceiling", &self.ceiling)
            .field("remaining", &self.remaining())
            .finish_non_exhaustive()
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_RATE_LIMIT)
    }
}

impl LoginRateLimiter {
    /// Build a limiter with a full budget. Negative ceilings are clamped to zero.
    #[must_use]
    pub fn new(ceiling: i64) -> Self {
        Self::with_draw(ceiling, Box::new(ThreadRngDraw))
    }

    #[must_use]
    pub fn with_draw(ceiling: i64, draw: Box<dyn ResetDraw>) -> Self {
        let ceiling = ceiling.max(0);
        Self {
            ceiling,
            remaining: AtomicI64::new(ceiling),
            draw,
        }
    }

    /// Start with a partially spent budget, clamped into `[0, ceiling]`.
    #[must_use]
    pub fn with_remaining(self, remaining: i64) -> Self {
        self.remaining
            .store(remaining.clamp(0, self.ceiling), Ordering::SeqCst);
        self
    }

    #[must_use]
    pub fn ceiling(&self) -> i64 {
        self.ceiling
    }

    #[must_use]
    pub fn remaining(&self) -> i64 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Pass the gate once.
    ///
    /// Admitted attempts are charged immediately. Rejected attempts are not charged
    /// and may refill the budget as a side effect.
    pub fn try_consume(&self) -> RateLimitSnapshot {
        let charged = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                (remaining > 0).then(|| remaining - 1)
            });

        match charged {
            Ok(previous) => RateLimitSnapshot {
                decision: RateLimitDecision::Allowed,
                ceiling: self.ceiling,
                remaining: previous - 1,
            },
            Err(_) => {
                self.maybe_reset();
                RateLimitSnapshot {
                    decision: RateLimitDecision::Limited,
                    ceiling: self.ceiling,
                    remaining: self.remaining(),
                }
            }
        }
    }

    fn maybe_reset(&self) {
        if self.draw.draw(RESET_DRAW_BOUND) == RESET_SENTINEL {
            self.remaining.store(self.ceiling, Ordering::SeqCst);
            debug!(ceiling = self.ceiling, "Login rate limit budget reset");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::FixedDraw;
    use super::*;
    use std::sync::Arc;

    #[test]
    fn new_limiter_starts_full() {
        let limiter = LoginRateLimiter::new(10);
        assert_eq!(limiter.ceiling(), 10);
        assert_eq!(limiter.remaining(), 10);
    }

    #[test]
    fn admitted_attempt_is_charged_one_unit() {
        let limiter = LoginRateLimiter::new(10);
        let snapshot = limiter.try_consume();
        assert!(snapshot.is_allowed());
        assert_eq!(snapshot.remaining, 9);
        assert_eq!(snapshot.ceiling, 10);
        assert_eq!(limiter.remaining(), 9);
    }

    #[test]
    fn exhausted_budget_rejects_without_charge() {
        let limiter = LoginRateLimiter::with_draw(3, Box::new(FixedDraw(0))).with_remaining(0);
        let snapshot = limiter.try_consume();
        assert_eq!(snapshot.decision, RateLimitDecision::Limited);
        assert_eq!(snapshot.remaining, 0);
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn sentinel_draw_refills_budget_on_rejection() {
        let limiter = LoginRateLimiter::with_draw(10, Box::new(FixedDraw(3))).with_remaining(0);
        let snapshot = limiter.try_consume();
        assert_eq!(snapshot.decision, RateLimitDecision::Limited);
        assert_eq!(snapshot.remaining, 10);
        assert_eq!(limiter.remaining(), 10);
    }

    #[test]
    fn non_sentinel_draws_leave_budget_exhausted() {
        for value in [0, 1, 2, 4] {
            let limiter =
                LoginRateLimiter::with_draw(10, Box::new(FixedDraw(value))).with_remaining(0);
            let snapshot = limiter.try_consume();
            assert_eq!(snapshot.remaining, 0, "draw {value} must not reset");
        }
    }

    #[test]
    fn successful_attempts_never_trigger_reset() {
        let limiter = LoginRateLimiter::with_draw(2, Box::new(FixedDraw(3)));
        assert!(limiter.try_consume().is_allowed());
        assert!(limiter.try_consume().is_allowed());
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn with_remaining_clamps_into_range() {
        let limiter = LoginRateLimiter::new(5).with_remaining(42);
        assert_eq!(limiter.remaining(), 5);
        let limiter = LoginRateLimiter::new(5).with_remaining(-3);
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn thread_rng_draw_stays_in_bounds() {
        let draw = ThreadRngDraw;
        for _ in 0..1000 {
            assert!(draw.draw(RESET_DRAW_BOUND) < RESET_DRAW_BOUND);
        }
    }

    #[test]
    fn concurrent_attempts_respect_budget() {
        let limiter = Arc::new(LoginRateLimiter::with_draw(10, Box::new(FixedDraw(0))));
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.try_consume().is_allowed())
            })
            .collect();

        let admitted = handles
            .into_iter()
            .filter_map(|handle| handle.join().ok())
            .filter(|allowed| *allowed)
            .count();

        assert_eq!(admitted, 10);
        assert_eq!(limiter.remaining(), 0);
    }
}
