//! Retry with exponential back-off and jitter for places requests.
//!
//! [`retry_with_backoff`] retries transient failures (network errors, 5xx).
//! Provider-level rejections such as `REQUEST_DENIED` are returned at once.

use std::future::Future;
use std::time::Duration;

use crate::error::PlacesError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connection failures, HTTP 5xx.
///
/// **Not retriable:** 4xx, provider status errors, malformed bodies and
/// configuration errors.
pub(crate) fn is_retriable(err: &PlacesError) -> bool {
    match err {
        PlacesError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        PlacesError::UnexpectedStatus { status } => (500..600).contains(status),
        PlacesError::ApiStatus { .. }
        | PlacesError::Deserialize { .. }
        | PlacesError::InvalidBaseUrl { .. } => false,
    }
}

const MAX_DELAY_MS: u64 = 30_000;

/// Sleep before retry `attempt` (1-based): `base_ms × 2ⁿ⁻¹` capped at 30 s,
/// then scaled by `jitter` (expected in `0.75..=1.25`).
fn backoff_delay(attempt: u32, base_ms: u64, jitter: f64) -> Duration {
    let exponent = attempt.saturating_sub(1).min(10);
    let capped = base_ms.saturating_mul(1u64 << exponent).min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let millis = (capped as f64 * jitter) as u64;
    Duration::from_millis(millis)
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, PlacesError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlacesError>>,
{
    let mut attempt = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retriable(&err) && attempt < max_retries => err,
            Err(err) => return Err(err),
        };

        attempt += 1;
        let delay = backoff_delay(attempt, backoff_base_ms, rand::random::<f64>() * 0.5 + 0.75);
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "places request failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
