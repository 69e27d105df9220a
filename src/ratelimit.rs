// src/ratelimit.rs
//! Per-provider rate limiter: a small concurrency bound, a bounded wait
//! queue, and an optional rolling-window call cap for quota-constrained
//! sources. One instance per process per external quota; shared by reference
//! across requests, since the upstream quota is global to the process.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::Semaphore;

pub const DEFAULT_MAX_CONCURRENT: usize = 2;
pub const DEFAULT_MAX_QUEUE: usize = 64;

/// The wait queue is full (or the window cap is spent). Callers fail fast
/// instead of hanging; the engine treats this like any provider failure.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("rate limit exceeded")]
pub struct RateLimitExceeded;

struct WindowCap {
    max_calls: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

struct WindowState {
    window_start: Instant,
    calls_in_window: u32,
}

impl WindowCap {
    fn admit(&self) -> Result<(), RateLimitExceeded> {
        let mut st = match self.state.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        let now = Instant::now();
        if now.duration_since(st.window_start) >= self.window {
            st.window_start = now;
            st.calls_in_window = 0;
        }
        if st.calls_in_window >= self.max_calls {
            return Err(RateLimitExceeded);
        }
        st.calls_in_window += 1;
        Ok(())
    }
}

pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    waiting: AtomicUsize,
    max_queue: usize,
    window: Option<WindowCap>,
}

/// Decrements the wait counter even if the waiter is cancelled mid-acquire.
struct WaitGuard<'a>(&'a AtomicUsize);

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RateLimiter {
    pub fn new(max_concurrent: usize, max_queue: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            waiting: AtomicUsize::new(0),
            max_queue,
            window: None,
        }
    }

    /// Add a rolling-window call cap on top of the concurrency bound.
    pub fn with_window(mut self, max_calls: u32, window: Duration) -> Self {
        self.window = Some(WindowCap {
            max_calls,
            window,
            state: Mutex::new(WindowState {
                window_start: Instant::now(),
                calls_in_window: 0,
            }),
        });
        self
    }

    /// Run `fut` under a concurrency permit. Queues until a slot frees up,
    /// failing fast once `max_queue` callers are already waiting. The permit
    /// is held for the whole call and released on every exit path.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, RateLimitExceeded>
    where
        F: std::future::Future<Output = T>,
    {
        let permit = match self.semaphore.try_acquire() {
            Ok(p) => p,
            Err(_) => {
                // No free slot: join the wait queue, bounded by max_queue.
                if self.waiting.fetch_add(1, Ordering::SeqCst) >= self.max_queue {
                    self.waiting.fetch_sub(1, Ordering::SeqCst);
                    return Err(RateLimitExceeded);
                }
                let _wait = WaitGuard(&self.waiting);
                // The semaphore is never closed; acquire only fails after close.
                self.semaphore
                    .acquire()
                    .await
                    .map_err(|_| RateLimitExceeded)?
            }
        };

        if let Some(cap) = &self.window {
            cap.admit()?;
        }

        let out = fut.await;
        drop(permit);
        Ok(out)
    }

    /// Waiters currently queued for a permit. Diagnostic only.
    pub fn queued(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT, DEFAULT_MAX_QUEUE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_inner_value() {
        let limiter = RateLimiter::new(1, 4);
        let out = limiter.run(async { 41 + 1 }).await.unwrap();
        assert_eq!(out, 42);
    }

    #[tokio::test]
    async fn window_cap_spends_then_blocks() {
        let limiter = RateLimiter::new(2, 4).with_window(2, Duration::from_secs(60));
        assert!(limiter.run(async {}).await.is_ok());
        assert!(limiter.run(async {}).await.is_ok());
        assert_eq!(limiter.run(async {}).await, Err(RateLimitExceeded));
    }

    #[tokio::test]
    async fn queue_overflow_fails_fast() {
        let limiter = Arc::new(RateLimiter::new(1, 0));
        // Hold the only permit.
        let l = limiter.clone();
        let hold = tokio::spawn(async move {
            l.run(async {
                tokio::time::sleep(Duration::from_millis(100)).await;
            })
            .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        // max_queue = 0: nobody may wait.
        assert_eq!(limiter.run(async {}).await, Err(RateLimitExceeded));
        hold.await.unwrap().unwrap();
    }
}
