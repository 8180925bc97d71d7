//! Retry logic with exponential backoff for XRPC calls.
//!
//! Retries transport errors (connection failures, timeouts) and responses
//! whose status is transient (429, 5xx). Everything else, including 4xx
//! responses and body decoding failures, is returned immediately for the
//! caller to classify.

use std::time::Duration;

/// Backoff budget for one logical call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    /// Retry attempts after the initial request.
    pub max_retries: u32,
    /// Delay before the first retry (doubles each attempt).
    pub base_delay: Duration,
}

/// Longest wait between two attempts.
pub(crate) const MAX_BACKOFF: Duration = Duration::from_secs(30);

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`, capped at [`MAX_BACKOFF`].
    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }
}

/// Statuses worth repeating unchanged.
pub(crate) fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Send an HTTP request with exponential backoff.
///
/// The closure `f` is called up to `max_retries + 1` times. The final
/// attempt's outcome is returned as-is, transient status included.
pub(crate) async fn retry_send<F, Fut>(
    policy: RetryPolicy,
    endpoint: &str,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..policy.max_retries {
        let delay = policy.backoff(attempt);
        match f().await {
            Ok(resp) if !is_transient_status(resp.status()) => return Ok(resp),
            Ok(resp) => {
                tracing::warn!(
                    endpoint,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    status = resp.status().as_u16(),
                    "XRPC call returned transient status, retrying in {delay:?}"
                );
            }
            Err(e) => {
                tracing::warn!(
                    endpoint,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    "XRPC request failed, retrying in {delay:?}: {e}"
                );
            }
        }
        tokio::time::sleep(delay).await;
    }
    // Final attempt.
    f().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn transient_statuses() {
        assert!(is_transient_status(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient_status(reqwest::StatusCode::BAD_GATEWAY));
        assert!(!is_transient_status(reqwest::StatusCode::BAD_REQUEST));
        assert!(!is_transient_status(reqwest::StatusCode::UNAUTHORIZED));
        assert!(!is_transient_status(reqwest::StatusCode::OK));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = RetryPolicy {
            max_retries: 100,
            base_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(6), MAX_BACKOFF);
        assert_eq!(policy.backoff(32), MAX_BACKOFF);
        assert_eq!(policy.backoff(u32::MAX), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn retry_exhausts_all_attempts_on_transport_failure() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
        };

        let result = retry_send(policy, "GET test", || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                // Request to a guaranteed-closed port → connection refused.
                reqwest::Client::builder()
                    .timeout(Duration::from_millis(50))
                    .build()
                    .unwrap()
                    .get("http://127.0.0.1:1/")
                    .send()
                    .await
            }
        })
        .await;

        assert!(result.is_err(), "request to closed port must fail");
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();
        let policy = RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(1),
        };

        let _ = retry_send(policy, "GET test", || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                reqwest::Client::new().get("http://127.0.0.1:1/").send().await
            }
        })
        .await;

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
