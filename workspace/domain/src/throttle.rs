//! Failed-login rate limiting.
//!
//! Failures are counted per key (lowercased username and client IP). The
//! decay window starts at the first failure and is not extended by later
//! ones; once it has elapsed the counter starts over.

use moka::future::Cache;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_DECAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Attempts {
    hits: u32,
    resets_at: Instant,
}

impl Attempts {
    fn expired(&self, now: Instant) -> bool {
        now >= self.resets_at
    }
}

#[derive(Clone, Debug)]
pub struct LoginThrottle {
    attempts: Cache<String, Attempts>,
    max_attempts: u32,
    decay: Duration,
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_DECAY)
    }
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, decay: Duration) -> Self {
        let attempts = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(decay)
            .build();

        Self {
            attempts,
            max_attempts,
            decay,
        }
    }

    /// Throttle key for a login attempt.
    pub fn key(username: &str, ip: &str) -> String {
        format!("{}|{}", username.to_lowercase(), ip)
    }

    /// Seconds until the key may try again, or `None` when it is not locked out.
    pub async fn available_in(&self, key: &str) -> Option<u64> {
        let attempts = self.attempts.get(key).await?;
        let now = Instant::now();
        if attempts.expired(now) || attempts.hits < self.max_attempts {
            return None;
        }
        Some(seconds_until(attempts.resets_at, now))
    }

    /// Takes one attempt for `key` and returns how many were taken in the
    /// current window, or the seconds to wait when the key is locked out.
    ///
    /// Checking and counting happen in one step, so concurrent logins cannot
    /// exceed the limit. A taken attempt counts as a failure until
    /// [`LoginThrottle::clear`] releases the key.
    pub async fn attempt(&self, key: &str) -> Result<u32, u64> {
        let decay = self.decay;
        let max_attempts = self.max_attempts;
        let mut locked_until = None;

        let entry = self
            .attempts
            .entry_by_ref(key)
            .and_upsert_with(|existing| {
                let now = Instant::now();
                let attempts = match existing.map(|entry| entry.into_value()) {
                    Some(attempts) if !attempts.expired(now) && attempts.hits >= max_attempts => {
                        locked_until = Some(attempts.resets_at);
                        attempts
                    }
                    Some(attempts) if !attempts.expired(now) => Attempts {
                        hits: attempts.hits.saturating_add(1),
                        resets_at: attempts.resets_at,
                    },
                    _ => Attempts {
                        hits: 1,
                        resets_at: now + decay,
                    },
                };
                std::future::ready(attempts)
            })
            .await;

        if let Some(resets_at) = locked_until {
            warn!("Login attempts exhausted for key '{}'", key);
            return Err(seconds_until(resets_at, Instant::now()));
        }

        let hits = entry.into_value().hits;
        debug!("Login attempt {} of {} for key '{}'", hits, max_attempts, key);
        Ok(hits)
    }

    pub async fn clear(&self, key: &str) {
        self.attempts.invalidate(key).await;
    }
}

/// Whole seconds until `resets_at`, rounded up so a client never retries a
/// moment too early.
fn seconds_until(resets_at: Instant, now: Instant) -> u64 {
    let remaining = resets_at.saturating_duration_since(now);
    let mut seconds = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        seconds += 1;
    }
    seconds.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_case_insensitive_on_username() {
        assert_eq!(LoginThrottle::key("UTester", "10.0.0.1"), "utester|10.0.0.1");
    }

    #[tokio::test]
    async fn test_locks_after_max_attempts() {
        let throttle = LoginThrottle::default();
        let key = LoginThrottle::key("utester", "127.0.0.1");

        for n in 1..=DEFAULT_MAX_ATTEMPTS {
            assert_eq!(throttle.available_in(&key).await, None);
            assert_eq!(throttle.attempt(&key).await, Ok(n));
        }

        let seconds = throttle.attempt(&key).await.unwrap_err();
        assert!(seconds > 0 && seconds <= 60);
        assert_eq!(throttle.available_in(&key).await, Some(seconds));

        // Other usernames and addresses are unaffected
        assert_eq!(throttle.available_in(&LoginThrottle::key("utester", "10.0.0.2")).await, None);
        assert_eq!(throttle.available_in(&LoginThrottle::key("atester", "127.0.0.1")).await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_attempts_respect_the_limit() {
        let throttle = LoginThrottle::default();

        let attempts: Vec<_> = (0..20)
            .map(|_| {
                let throttle = throttle.clone();
                tokio::spawn(async move { throttle.attempt("k").await })
            })
            .collect();

        let mut allowed = 0;
        for attempt in attempts {
            if attempt.await.unwrap().is_ok() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, DEFAULT_MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_clear_resets_the_counter() {
        let throttle = LoginThrottle::new(2, DEFAULT_DECAY);
        throttle.attempt("k").await.unwrap();
        throttle.attempt("k").await.unwrap();
        assert!(throttle.attempt("k").await.is_err());

        throttle.clear("k").await;
        assert_eq!(throttle.available_in("k").await, None);
        assert_eq!(throttle.attempt("k").await, Ok(1));
    }

    #[tokio::test]
    async fn test_window_expires() {
        let throttle = LoginThrottle::new(1, Duration::from_millis(200));
        assert_eq!(throttle.attempt("k").await, Ok(1));
        assert_eq!(throttle.attempt("k").await, Err(1));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(throttle.available_in("k").await, None);
        assert_eq!(throttle.attempt("k").await, Ok(1));
    }
}
