//! Sliding-window requests-per-minute limiter. Unlike a rejecting limiter,
//! `acquire` waits until the oldest hit leaves the window.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const MINUTE: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct RateLimiter {
    /// 0 disables limiting
    limit: u32,
    window: Duration,
    hits: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn per_minute(rpm: u32) -> Self {
        Self::with_window(rpm, MINUTE)
    }

    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            hits: Mutex::new(VecDeque::new()),
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit == 0
    }

    /// Wait for a free slot and take it
    pub async fn acquire(&self) {
        if self.is_unlimited() {
            return;
        }
        loop {
            let wait = {
                let mut hits = self.hits.lock().await;
                let now = Instant::now();
                while hits
                    .front()
                    .is_some_and(|oldest| now.duration_since(*oldest) >= self.window)
                {
                    hits.pop_front();
                }
                if hits.len() < self.limit as usize {
                    hits.push_back(now);
                    return;
                }
                match hits.front() {
                    Some(oldest) => (*oldest + self.window).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };
            tracing::debug!(wait_ms = wait.as_millis() as u64, limit = self.limit, "Rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unlimited_never_waits() {
        let limiter = RateLimiter::per_minute(0);
        let started = Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_waits_for_window_to_slide() {
        let limiter = RateLimiter::with_window(2, Duration::from_millis(150));
        let started = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(started.elapsed() < Duration::from_millis(100));
        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_millis(150));
    }
}
