//! Property-based tests for the backoff policy

use proptest::prelude::*;
use std::time::Duration;
use tasksync::client::offline::RetryPolicy;

fn policy(base_ms: u64, max_ms: u64, max_attempts: u32, jitter: bool) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(base_ms),
        max_delay: Duration::from_millis(max_ms),
        jitter,
    }
}

proptest! {
    #[test]
    fn test_base_delays_non_decreasing_and_capped(
        base_ms in 1u64..10_000,
        extra_ms in 0u64..120_000,
        max_attempts in 2u32..40,
    ) {
        let max_ms = base_ms + extra_ms;
        let policy = policy(base_ms, max_ms, max_attempts, false);

        prop_assert_eq!(policy.base_delay_for(1), Duration::ZERO);
        prop_assert_eq!(policy.base_delay_for(2), Duration::from_millis(base_ms));
        let mut previous = Duration::ZERO;
        for attempt in 2..=max_attempts {
            let delay = policy.base_delay_for(attempt);
            prop_assert!(delay >= previous);
            prop_assert!(delay <= Duration::from_millis(max_ms));
            previous = delay;
        }
    }

    #[test]
    fn test_jittered_delay_within_a_quarter(
        base_ms in 1u64..10_000,
        attempt in 2u32..12,
    ) {
        let policy = policy(base_ms, 60_000, 12, true);
        let base = policy.base_delay_for(attempt);
        let delay = policy.delay_for(attempt);

        prop_assert!(delay >= base.mul_f64(0.75));
        prop_assert!(delay <= base.mul_f64(1.25));
    }

    #[test]
    fn test_exhaustion_threshold(max_attempts in 1u32..20, attempts in 0u32..40) {
        let policy = policy(1_000, 60_000, max_attempts, false);
        prop_assert_eq!(policy.is_exhausted(attempts), attempts >= max_attempts);
    }
}
