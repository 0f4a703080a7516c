use dashmap::DashMap;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Sliding-window request limiter keyed by client.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: DashMap::new(),
        }
    }

    /// Records a request from `key`. When the window is full, returns how long
    /// until the oldest request in it falls out.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut hits = self.hits.entry(key.to_string()).or_default();
        while hits
            .front()
            .is_some_and(|oldest| now.saturating_duration_since(*oldest) >= self.window)
        {
            hits.pop_front();
        }

        if hits.len() >= self.max_requests {
            let retry_after = hits
                .front()
                .map(|oldest| self.window.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or(self.window);
            return Err(retry_after);
        }

        hits.push_back(now);
        Ok(())
    }

    /// Drops clients with no requests inside the window.
    pub fn prune(&self) {
        let now = Instant::now();
        self.hits.retain(|_, hits| {
            hits.back()
                .is_some_and(|newest| now.saturating_duration_since(*newest) < self.window)
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.hits.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("10.0.0.1", now).is_ok());
        }
        assert_eq!(
            limiter.check_at("10.0.0.1", now),
            Err(Duration::from_secs(60))
        );
    }

    #[test]
    fn test_clients_are_limited_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at("10.0.0.1", now).is_ok());
        assert!(limiter.check_at("10.0.0.2", now).is_ok());
        assert!(limiter.check_at("10.0.0.1", now).is_err());
    }

    #[test]
    fn test_window_slides() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        let start = Instant::now();

        assert!(limiter.check_at("client", start).is_ok());
        assert!(limiter
            .check_at("client", start + Duration::from_secs(30))
            .is_ok());
        assert_eq!(
            limiter.check_at("client", start + Duration::from_secs(45)),
            Err(Duration::from_secs(15))
        );
        assert!(limiter
            .check_at("client", start + Duration::from_secs(60))
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_forgets_idle_clients() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        limiter.check("idle").unwrap();
        tokio::time::advance(Duration::from_secs(45)).await;
        limiter.check("active").unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        limiter.prune();

        assert_eq!(limiter.tracked_clients(), 1);
        assert!(limiter.check("idle").is_ok());
    }
}
