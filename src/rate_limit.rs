// src/rate_limit.rs
//! Fixed-window request budget per client identifier.
//!
//! Each identifier gets `max_requests` per window. The window starts on the
//! first request and is replaced wholesale once it has expired; there is no
//! sliding. Check-and-increment happens under a single lock so two racing
//! requests can never both take the last slot.
//!
//! Records are kept in process memory. Expired records are swept every
//! `cleanup_interval` checks, and the number of tracked identifiers is capped
//! at `max_tracked_clients`.

use crate::clock::Clock;
use crate::config::RateLimitSettings;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Partition key used when nothing identifies the caller.
pub const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, at least 1.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds().max(0) as u64;
        millis.div_ceil(1000).max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl From<&RateLimitSettings> for RateLimitPolicy {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            max_requests: settings.max_requests,
            window: Duration::from_secs(settings.window_secs),
        }
    }
}

/// Storage-agnostic limiter interface. The in-memory implementation below
/// is per process; a shared store could implement the same contract.
pub trait RateLimiter: Send + Sync {
    fn check(&self, identifier: &str, max_requests: u32, window: Duration) -> RateLimitDecision;
}

pub struct InMemoryRateLimiter {
    clock: Arc<dyn Clock>,
    records: Mutex<HashMap<String, RateLimitRecord>>,
    checks: AtomicU64,
    cleanup_interval: u64,
    max_tracked_clients: usize,
}

impl InMemoryRateLimiter {
    pub fn new(clock: Arc<dyn Clock>, settings: &RateLimitSettings) -> Self {
        Self {
            clock,
            records: Mutex::new(HashMap::new()),
            checks: AtomicU64::new(0),
            cleanup_interval: settings.cleanup_interval.max(1),
            max_tracked_clients: settings.max_tracked_clients.max(1),
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.lock_records().len()
    }

    /// Drop every record whose window has ended.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut records = self.lock_records();
        Self::sweep_expired(&mut records, now)
    }

    fn sweep_expired(records: &mut HashMap<String, RateLimitRecord>, now: DateTime<Utc>) -> usize {
        let before = records.len();
        records.retain(|_, record| record.reset_at >= now);
        before - records.len()
    }

    fn lock_records(&self) -> std::sync::MutexGuard<'_, HashMap<String, RateLimitRecord>> {
        self.records
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn make_room(&self, records: &mut HashMap<String, RateLimitRecord>, now: DateTime<Utc>) {
        let removed = Self::sweep_expired(records, now);
        debug!("Rate limiter at capacity, swept {} expired record(s)", removed);

        if records.len() >= self.max_tracked_clients {
            let oldest = records
                .iter()
                .min_by_key(|(_, record)| record.reset_at)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                warn!(
                    "Rate limiter tracking {} clients, evicting {}",
                    records.len(),
                    key
                );
                records.remove(&key);
            }
        }
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, identifier: &str, max_requests: u32, window: Duration) -> RateLimitDecision {
        let now = self.clock.now();
        let window_millis = window.as_millis().min(i64::MAX as u128) as i64;
        let window = chrono::Duration::milliseconds(window_millis);
        let fresh = RateLimitRecord {
            count: 1,
            reset_at: now + window,
        };

        let check_number = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        let mut records = self.lock_records();

        if check_number % self.cleanup_interval == 0 {
            let removed = Self::sweep_expired(&mut records, now);
            debug!("Periodic rate limiter sweep removed {} record(s)", removed);
        }

        if !records.contains_key(identifier) && records.len() >= self.max_tracked_clients {
            self.make_room(&mut records, now);
        }

        let record = records.entry(identifier.to_string()).or_insert_with(|| RateLimitRecord {
            count: 0,
            reset_at: fresh.reset_at,
        });

        if record.count == 0 || now > record.reset_at {
            *record = fresh;
        } else if record.count >= max_requests {
            return RateLimitDecision {
                allowed: false,
                limit: max_requests,
                remaining: 0,
                reset_at: record.reset_at,
            };
        } else {
            record.count += 1;
        }

        RateLimitDecision {
            allowed: true,
            limit: max_requests,
            remaining: max_requests.saturating_sub(record.count),
            reset_at: record.reset_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    const WINDOW: Duration = Duration::from_secs(60);

    fn limiter() -> (InMemoryRateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        ));
        let limiter = InMemoryRateLimiter::new(clock.clone(), &RateLimitSettings::default());
        (limiter, clock)
    }

    #[test]
    fn test_allows_exactly_max_requests_per_window() {
        let (limiter, clock) = limiter();
        let start = clock.now();

        for i in 1..=10 {
            let decision = limiter.check("10.0.0.1", 10, WINDOW);
            assert!(decision.allowed, "request {} should be allowed", i);
            assert_eq!(decision.remaining, 10 - i);
            assert_eq!(decision.reset_at, start + chrono::Duration::seconds(60));
        }

        let denied = limiter.check("10.0.0.1", 10, WINDOW);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after_secs(clock.now()), 60);

        // Denials do not consume budget or move the window.
        let again = limiter.check("10.0.0.1", 10, WINDOW);
        assert_eq!(again.reset_at, denied.reset_at);
    }

    #[test]
    fn test_window_rollover_resets_count() {
        let (limiter, clock) = limiter();
        for _ in 0..10 {
            limiter.check("client", 10, WINDOW);
        }
        assert!(!limiter.check("client", 10, WINDOW).allowed);

        // Exactly at reset_at the old window still applies.
        clock.advance(chrono::Duration::seconds(60));
        assert!(!limiter.check("client", 10, WINDOW).allowed);

        clock.advance(chrono::Duration::milliseconds(1));
        let decision = limiter.check("client", 10, WINDOW);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 9);
        assert_eq!(decision.reset_at, clock.now() + chrono::Duration::seconds(60));
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (limiter, _) = limiter();
        for _ in 0..3 {
            limiter.check("a", 3, WINDOW);
        }
        assert!(!limiter.check("a", 3, WINDOW).allowed);
        assert!(limiter.check("b", 3, WINDOW).allowed);
    }

    #[test]
    fn test_concurrent_checks_never_exceed_limit() {
        let (limiter, _) = limiter();
        let limiter = Arc::new(limiter);
        let handles: Vec<_> = (0..64)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.check("shared", 7, WINDOW).allowed)
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(admitted, 7);
    }

    #[test]
    fn test_concurrent_checks_below_limit_all_pass() {
        let (limiter, _) = limiter();
        let limiter = Arc::new(limiter);
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.check("shared", 10, WINDOW).allowed)
            })
            .collect();
        assert!(handles.into_iter().all(|h| h.join().unwrap()));
    }

    #[test]
    fn test_sweep_removes_expired_records() {
        let (limiter, clock) = limiter();
        limiter.check("a", 10, WINDOW);
        limiter.check("b", 10, WINDOW);
        clock.advance(chrono::Duration::seconds(61));
        limiter.check("c", 10, WINDOW);

        assert_eq!(limiter.sweep(), 2);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let settings = RateLimitSettings {
            max_tracked_clients: 3,
            ..Default::default()
        };
        let limiter = InMemoryRateLimiter::new(clock.clone(), &settings);

        for (i, id) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            clock.advance(chrono::Duration::seconds(1));
            assert!(limiter.check(id, 10, WINDOW).allowed, "client {} ({})", id, i);
        }
        assert_eq!(limiter.tracked_clients(), 3);
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let decision = RateLimitDecision {
            allowed: false,
            limit: 10,
            remaining: 0,
            reset_at: now + chrono::Duration::milliseconds(1500),
        };
        assert_eq!(decision.retry_after_secs(now), 2);
        assert_eq!(decision.retry_after_secs(now + chrono::Duration::seconds(5)), 1);
    }
}
