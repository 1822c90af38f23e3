//! # Dispatch Throttling
//!
//! Leaky-bucket rate limiting for remote calls.
//!
//! ## Overview
//!
//! The backend permits a burst of calls up front, then a fixed steady-state
//! rate. The [`LeakyBucket`] models this as a monotone counter over admitted
//! calls: each admission gets a 0-based sequence position and a delay telling
//! the caller how long to hold the call before dispatch.
//!
//! ```text
//! delay(position) = base_delay + max(0, (position - burst) / leak_rate)
//! ```
//!
//! Positions at or below the burst capacity dispatch immediately (plus the
//! optional flat `base_delay`); later positions land on the leak-rate grid:
//! with the default capacity of 40 and the fixed rate of 2 calls/second,
//! position 41 waits 0.5 s, position 42 waits 1 s, and so on.
//!
//! The counter is never reset or replenished: one bucket covers one bounded
//! run of the engine, matching batch-style invocation rather than a
//! long-lived server.
//!
//! ## Concurrency
//!
//! `admit` is a single atomic fetch-add; concurrent admissions always observe
//! distinct positions and the computed delay is a pure function of position.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Steady-state permitted call rate after the burst, in calls per second.
///
/// Fixed by the backend's documented quota; not configurable.
pub const LEAK_RATE_PER_SEC: u64 = 2;

/// The scheduling record handed out at admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSlot {
    /// 0-based position in admission order.
    pub sequence_position: u64,
    /// How long to hold the call before dispatching it.
    pub scheduled_delay: Duration,
}

impl DispatchSlot {
    /// Whether this slot may dispatch without waiting.
    pub fn is_immediate(&self) -> bool {
        self.scheduled_delay.is_zero()
    }
}

/// Admission counter plus the delay schedule derived from it.
#[derive(Debug)]
pub struct LeakyBucket {
    burst_capacity: u64,
    base_delay: Duration,
    admitted: AtomicU64,
}

impl LeakyBucket {
    /// Create a bucket with the given burst capacity and flat extra delay.
    pub fn new(burst_capacity: u64, base_delay: Duration) -> Self {
        Self {
            burst_capacity,
            base_delay,
            admitted: AtomicU64::new(0),
        }
    }

    /// Admit one call: claim the next sequence position and compute its delay.
    pub fn admit(&self) -> DispatchSlot {
        let position = self.admitted.fetch_add(1, Ordering::Relaxed);
        DispatchSlot {
            sequence_position: position,
            scheduled_delay: self.delay_for(position),
        }
    }

    /// The delay the schedule assigns to a given position.
    pub fn delay_for(&self, position: u64) -> Duration {
        let bucket = if position <= self.burst_capacity {
            Duration::ZERO
        } else {
            let overflow = position - self.burst_capacity;
            Duration::from_millis(overflow.saturating_mul(1000) / LEAK_RATE_PER_SEC)
        };

        self.base_delay + bucket
    }

    /// How many calls have been admitted so far.
    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    /// The configured burst capacity.
    pub fn burst_capacity(&self) -> u64 {
        self.burst_capacity
    }

    /// The configured flat extra delay.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn bucket() -> LeakyBucket {
        LeakyBucket::new(40, Duration::ZERO)
    }

    #[test]
    fn test_positions_are_sequential() {
        let b = bucket();
        assert_eq!(b.admit().sequence_position, 0);
        assert_eq!(b.admit().sequence_position, 1);
        assert_eq!(b.admit().sequence_position, 2);
        assert_eq!(b.admitted(), 3);
    }

    #[test]
    fn test_burst_positions_dispatch_immediately() {
        let b = bucket();
        for expected in 0..=40u64 {
            let slot = b.admit();
            assert_eq!(slot.sequence_position, expected);
            assert!(slot.is_immediate(), "position {} should be immediate", expected);
        }
    }

    #[test]
    fn test_leak_grid_past_the_burst() {
        let b = bucket();
        assert_eq!(b.delay_for(41), Duration::from_millis(500));
        assert_eq!(b.delay_for(42), Duration::from_secs(1));
        assert_eq!(b.delay_for(43), Duration::from_millis(1500));
        assert_eq!(b.delay_for(44), Duration::from_secs(2));
    }

    #[test]
    fn test_base_delay_applies_to_every_position() {
        let b = LeakyBucket::new(40, Duration::from_millis(1000));
        assert_eq!(b.delay_for(0), Duration::from_secs(1));
        assert_eq!(b.delay_for(40), Duration::from_secs(1));
        assert_eq!(b.delay_for(42), Duration::from_secs(2));
    }

    #[test]
    fn test_small_burst_capacity() {
        let b = LeakyBucket::new(2, Duration::ZERO);
        assert_eq!(b.delay_for(2), Duration::ZERO);
        assert_eq!(b.delay_for(3), Duration::from_millis(500));
        assert_eq!(b.delay_for(7), Duration::from_millis(2500));
    }

    #[test]
    fn test_zero_burst_capacity() {
        let b = LeakyBucket::new(0, Duration::ZERO);
        assert_eq!(b.delay_for(0), Duration::ZERO);
        assert_eq!(b.delay_for(1), Duration::from_millis(500));
    }

    #[test]
    fn test_admit_matches_delay_for() {
        let b = bucket();
        for _ in 0..45 {
            let slot = b.admit();
            assert_eq!(slot.scheduled_delay, b.delay_for(slot.sequence_position));
        }
    }

    #[test]
    fn test_concurrent_admission_yields_unique_positions() {
        let b = Arc::new(bucket());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let b = Arc::clone(&b);
            handles.push(std::thread::spawn(move || {
                (0..100).map(|_| b.admit().sequence_position).collect::<Vec<_>>()
            }));
        }

        let mut seen = std::collections::HashSet::new();
        for handle in handles {
            for position in handle.join().unwrap() {
                assert!(seen.insert(position), "position {} handed out twice", position);
            }
        }

        assert_eq!(seen.len(), 800);
        assert_eq!(b.admitted(), 800);
    }
}
