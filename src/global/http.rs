use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::global::config::{self, AppConfig};
use crate::global::error::HttpError;
use crate::global::module::RateLimiter;

/// HTTP clients with per-upstream rate limiting.
#[derive(Clone)]
pub struct HttpClientManager {
    clients: Arc<ClientPool>,
}

struct ClientPool {
    tmdb: ClientWithLimiter,
}

#[derive(Clone)]
pub struct ClientWithLimiter {
    pub client: Client,
    pub limiter: RateLimiter,
    pub name: String,
    retry: RetryConfig,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl From<&config::RetryConfig> for RetryConfig {
    fn from(cfg: &config::RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
        }
    }
}

impl RetryConfig {
    /// Exponential backoff for the given 1-based attempt, capped at `max_delay`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        std::cmp::min(self.base_delay.saturating_mul(factor), self.max_delay)
    }
}

#[derive(Clone, Default)]
pub struct RequestConfig {
    pub headers: HashMap<String, String>,
    pub retry_config: Option<RetryConfig>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_bearer_token(self, token: impl Into<String>) -> Self {
        self.with_header("Authorization", format!("Bearer {}", token.into()))
    }

    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }
}

impl HttpClientManager {
    pub fn new(config: &AppConfig) -> Result<Self, HttpError> {
        let retry = RetryConfig::from(&config.http.retry);

        let tmdb = ClientWithLimiter::new("tmdb", build_client(config)?, config.tmdb_rate_limit(), retry);

        Ok(Self {
            clients: Arc::new(ClientPool { tmdb }),
        })
    }

    pub fn tmdb(&self) -> &ClientWithLimiter {
        &self.clients.tmdb
    }
}

fn build_client(config: &AppConfig) -> Result<Client, HttpError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.http.timeout_seconds))
        .user_agent(config.http.user_agent.clone())
        .build()?)
}

impl ClientWithLimiter {
    pub fn new(name: &str, client: Client, requests_per_second: f64, retry: RetryConfig) -> Self {
        Self {
            client,
            limiter: RateLimiter::new(name, requests_per_second),
            name: name.to_string(),
            retry,
        }
    }

    /// Fetch and deserialize JSON, retrying with backoff on 429.
    ///
    /// * `Err(HttpError::NotFound)` - 404 response
    /// * `Err(HttpError::RateLimited)` - still throttled after max retries
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        config: Option<RequestConfig>,
    ) -> Result<T, HttpError> {
        let config = config.unwrap_or_default();
        let retry_config = config.retry_config.clone().unwrap_or_else(|| self.retry.clone());
        let mut attempt = 0;

        loop {
            attempt += 1;

            self.limiter.acquire().await;

            debug!(
                client = %self.name,
                url = %redact(url),
                attempt = attempt,
                max_attempts = retry_config.max_retries + 1,
                "Fetching"
            );

            let mut request = self.client.get(url);
            for (key, value) in &config.headers {
                request = request.header(key, value);
            }

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(client = %self.name, error = %e, "Request failed");
                    return Err(HttpError::RequestFailed(e));
                }
            };

            let status = response.status();

            match status {
                StatusCode::OK => {
                    return self.deserialize_response(response).await;
                }

                StatusCode::NOT_FOUND => {
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "No error message".to_string());

                    debug!(client = %self.name, url = %redact(url), "Resource not found (404)");
                    return Err(HttpError::NotFound(error_body));
                }

                StatusCode::TOO_MANY_REQUESTS => {
                    let retry_after = parse_retry_after(&response);
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Rate limit exceeded".to_string());

                    if attempt > retry_config.max_retries {
                        warn!(client = %self.name, attempts = attempt, "Max retries exceeded after rate limit");
                        return Err(HttpError::RateLimited {
                            retry_after,
                            message: error_body,
                        });
                    }

                    let delay = retry_after.unwrap_or_else(|| retry_config.backoff(attempt));

                    info!(
                        client = %self.name,
                        status = status.as_u16(),
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, retrying"
                    );

                    tokio::time::sleep(delay).await;
                    continue;
                }

                _ => {
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());

                    warn!(
                        client = %self.name,
                        status = status.as_u16(),
                        body = %error_body,
                        "Unexpected status"
                    );

                    return Err(HttpError::UnexpectedStatus {
                        status: status.as_u16(),
                        message: error_body,
                    });
                }
            }
        }
    }

    async fn deserialize_response<T: DeserializeOwned>(&self, response: Response) -> Result<T, HttpError> {
        response.json::<T>().await.map_err(|e| {
            warn!(client = %self.name, error = %e, "Deserialization failed");
            HttpError::DeserializationFailed(e.to_string())
        })
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Strip the `api_key` query parameter before a URL reaches the logs.
pub fn redact(url: &str) -> String {
    match url.split_once('?') {
        Some((path, query)) => {
            let query: Vec<&str> = query
                .split('&')
                .map(|pair| if pair.starts_with("api_key=") { "api_key=***" } else { pair })
                .collect();
            format!("{}?{}", path, query.join("&"))
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let retry = RetryConfig {
            max_retries: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };
        assert_eq!(retry.backoff(1), Duration::from_millis(500));
        assert_eq!(retry.backoff(2), Duration::from_secs(1));
        assert_eq!(retry.backoff(3), Duration::from_secs(2));
        assert_eq!(retry.backoff(4), Duration::from_secs(3));
        assert_eq!(retry.backoff(40), Duration::from_secs(3));
    }

    #[test]
    fn redacts_api_key() {
        assert_eq!(
            redact("https://api.themoviedb.org/3/tv/1396?api_key=abc&language=en-US"),
            "https://api.themoviedb.org/3/tv/1396?api_key=***&language=en-US"
        );
        assert_eq!(redact("https://example.com/x"), "https://example.com/x");
    }
}
