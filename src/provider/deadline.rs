//! Optional deadline for provider round trips

use crate::provider::ProviderError;
use std::future::Future;
use std::time::Duration;

/// Await `fut`, failing with [`ProviderError::timeout`] once `timeout` elapses
///
/// The wrapped future is dropped on expiry, which cancels it. `None` waits
/// indefinitely.
pub async fn with_timeout<T, F>(timeout: Option<Duration>, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match timeout {
        None => fut.await,
        Some(limit) => match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("Provider request timed out after {:?}", limit);
                Err(ProviderError::timeout(limit))
            }
        },
    }
}
