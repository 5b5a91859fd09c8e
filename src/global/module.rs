use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovernorRateLimiter};
use tokio::sync::mpsc;
use tracing::trace;

use super::{database::DatabaseInstance, error::AppError};

/// Messages that can be sent to parent modules
#[derive(Debug, Clone)]
pub enum ModuleMessage {
    Shutdown,
    Custom(String),
}

/// A long-running module driven by control messages
pub trait ParentModule: Send + Sync {
    fn name(&self) -> &str;

    fn run(
        &self,
        db: Arc<DatabaseInstance>,
        rx: mpsc::Receiver<ModuleMessage>,
    ) -> Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + '_>>;
}

/// Rate limiter for API requests using the governor crate
pub struct RateLimiter {
    limiter: Arc<GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    name: String,
    requests_per_second: f64,
}

impl RateLimiter {
    /// `requests_per_second` below 1 is turned into one request per interval.
    /// Non-positive rates fall back to one request per second.
    pub fn new(name: &str, requests_per_second: f64) -> Self {
        let quota = if requests_per_second >= 1.0 {
            let per_second = NonZeroU32::new(requests_per_second as u32).unwrap_or(NonZeroU32::MIN);
            Quota::per_second(per_second)
        } else if requests_per_second > 0.0 {
            let interval_ms = (1000.0 / requests_per_second) as u64;
            Quota::with_period(Duration::from_millis(interval_ms.max(1)))
                .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        } else {
            Quota::per_second(NonZeroU32::MIN)
        };

        Self {
            limiter: Arc::new(GovernorRateLimiter::direct(quota)),
            name: name.to_string(),
            requests_per_second,
        }
    }

    /// Wait until a request is allowed.
    pub async fn acquire(&self) {
        loop {
            match self.limiter.check() {
                Ok(_) => {
                    trace!(
                        limiter = %self.name,
                        rate = self.requests_per_second,
                        "Rate limiter permit acquired"
                    );
                    break;
                }
                Err(not_until) => {
                    let wait_duration = not_until.wait_time_from(DefaultClock::default().now());
                    tokio::time::sleep(wait_duration).await;
                }
            }
        }
    }

    /// Returns the wait duration if no permit is available right now.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }
}

impl Clone for RateLimiter {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            name: self.name.clone(),
            requests_per_second: self.requests_per_second,
        }
    }
}

/// Handle for controlling a parent module
pub struct ModuleHandle {
    pub name: String,
    pub tx: mpsc::Sender<ModuleMessage>,
}

impl ModuleHandle {
    pub async fn shutdown(&self) -> Result<(), AppError> {
        self.tx
            .send(ModuleMessage::Shutdown)
            .await
            .map_err(|e| AppError::Module(format!("Failed to send shutdown: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_permit_is_immediate() {
        let limiter = RateLimiter::new("test", 5.0);
        assert!(limiter.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn burst_beyond_quota_is_throttled() {
        let limiter = RateLimiter::new("test", 0.5);
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_err());
    }

    #[test]
    fn invalid_rates_do_not_panic() {
        let _ = RateLimiter::new("zero", 0.0);
        let _ = RateLimiter::new("negative", -3.0);
    }
}
