//! Retry/backoff helpers shared by the outbound clients

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with ±30% jitter.
///
/// `attempt` is 1-based; attempt 1 waits roughly `base`, attempt 2 roughly
/// `2 * base`, and so on.
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let exp = base.saturating_mul(1u32 << attempt.saturating_sub(1).min(6));
    let jitter = rand::rng().random_range(0.7..=1.3);
    exp.mul_f64(jitter)
}

/// Whether an HTTP status is worth retrying (rate limits, blocks, upstream
/// failures). Other 4xx responses are permanent for our purposes.
pub fn is_retryable_status(status: reqwest::StatusCode) -> bool {
    status.as_u16() == 403 || status.as_u16() == 429 || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_with_attempts() {
        let base = Duration::from_millis(500);
        let first = backoff_delay(1, base);
        let fourth = backoff_delay(4, base);
        // Even with maximum jitter on attempt 1 and minimum on attempt 4,
        // the fourth delay is larger.
        assert!(first <= Duration::from_millis(650));
        assert!(fourth >= Duration::from_millis(2800));
    }

    #[test]
    fn test_retryable_statuses() {
        use reqwest::StatusCode;
        assert!(is_retryable_status(StatusCode::FORBIDDEN));
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }
}
