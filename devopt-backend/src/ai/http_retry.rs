//! Per-endpoint exponential backoff for outbound HTTP calls
//!
//! Each endpoint key (usually the LLM endpoint URL) keeps its own delay. A
//! retryable failure doubles the delay up to the cap; a success, or a long
//! enough quiet period, starts over from the minimum.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;

/// HTTP statuses worth retrying, whether seen as a code or inside an error message
const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

static STATUS_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}\b").expect("status code pattern is valid"));

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Quiet period after which the next error starts from `min_delay` again
    pub reset_after: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            reset_after: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
struct BackoffState {
    current_delay: Duration,
    last_error_at: Instant,
    error_count: u32,
}

pub struct HttpRetryManager {
    policy: BackoffPolicy,
    states: RwLock<HashMap<String, BackoffState>>,
}

impl HttpRetryManager {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Shared instance with the default policy
    pub fn global() -> &'static HttpRetryManager {
        use std::sync::OnceLock;
        static INSTANCE: OnceLock<HttpRetryManager> = OnceLock::new();
        INSTANCE.get_or_init(|| HttpRetryManager::new(BackoffPolicy::default()))
    }

    pub fn record_success(&self, key: &str) {
        if self.states.write().remove(key).is_some() {
            log::debug!("[HTTP_RETRY] Success for '{}', backoff reset", key);
        }
    }

    /// Record a failure and return how long to wait before the next attempt
    pub fn record_error(&self, key: &str) -> Duration {
        let mut states = self.states.write();
        let now = Instant::now();
        let policy = self.policy;

        let state = states.entry(key.to_string()).or_insert_with(|| BackoffState {
            current_delay: policy.min_delay,
            last_error_at: now,
            error_count: 0,
        });

        if state.error_count > 0 && now.duration_since(state.last_error_at) > policy.reset_after {
            state.current_delay = policy.min_delay;
            state.error_count = 0;
        }

        state.error_count += 1;
        if state.error_count > 1 {
            state.current_delay = (state.current_delay * 2).min(policy.max_delay);
        }
        state.last_error_at = now;

        log::warn!(
            "[HTTP_RETRY] Error #{} for '{}', backoff: {:?}",
            state.error_count,
            key,
            state.current_delay
        );
        state.current_delay
    }

    pub fn current_delay(&self, key: &str) -> Option<Duration> {
        self.states.read().get(key).map(|s| s.current_delay)
    }

    /// Run `op` up to `max_attempts` times, sleeping with backoff between
    /// retryable failures. Non-retryable errors are returned immediately.
    pub async fn run<T, F, Fut>(&self, key: &str, max_attempts: u32, mut op: F) -> Result<T, String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, String>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    self.record_success(key);
                    return Ok(value);
                }
                Err(e) if attempt < max_attempts && Self::is_retryable_error(&e) => {
                    let delay = self.record_error(key);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Whether an error message describes a transient failure
    pub fn is_retryable_error(error: &str) -> bool {
        let error = error.to_lowercase();
        const TRANSIENT: &[&str] = &[
            "timeout",
            "timed out",
            "connection",
            "network",
            "dns",
            "internal server error",
            "bad gateway",
            "service unavailable",
            "gateway timeout",
            "too many requests",
            "rate limit",
        ];
        if TRANSIENT.iter().any(|needle| error.contains(needle)) {
            return true;
        }
        STATUS_CODE_RE
            .find_iter(&error)
            .filter_map(|m| m.as_str().parse::<u16>().ok())
            .any(Self::is_retryable_status)
    }

    pub fn is_retryable_status(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }
}

impl Default for HttpRetryManager {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}
