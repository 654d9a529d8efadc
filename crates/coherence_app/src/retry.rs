use std::future::Future;

use backon::{ExponentialBuilder, Retryable};
use coherence_config::RetryConfig;
use coherence_domain::{BackendError, BackendErrorKind, Error, Result};
use tracing::warn;

/// Runs `operation`, retrying retryable backend failures with exponential
/// backoff. With retries disabled the operation runs exactly once.
pub async fn retry_with_config<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut operation = operation;
    if !config.is_enabled() {
        return operation().await;
    }

    let mut strategy = ExponentialBuilder::default()
        .with_min_delay(config.min_delay())
        .with_factor(config.backoff_factor as f32)
        .with_max_times(config.max_retry_attempts)
        .with_jitter();
    if let Some(max_delay) = config.max_backoff() {
        strategy = strategy.with_max_delay(max_delay);
    }

    operation
        .retry(strategy)
        .when(|error| should_retry(error, &config.retry_status_codes))
        .notify(|error, delay| warn!(error = %error, delay = ?delay, "Retrying turn"))
        .await
}

/// Transport failures, timeouts and the configured status codes are
/// retryable; everything else is final.
fn should_retry(error: &Error, retry_status_codes: &[u16]) -> bool {
    match error {
        Error::Backend(BackendError { kind, .. }) => match kind {
            BackendErrorKind::Transport | BackendErrorKind::Timeout => true,
            BackendErrorKind::Status(code) => retry_status_codes.contains(code),
            BackendErrorKind::MalformedResponse | BackendErrorKind::MissingCredential => false,
        },
        _ => false,
    }
}
