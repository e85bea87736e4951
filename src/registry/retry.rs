use std::future::Future;
use std::time::Duration;

use super::RegistryError;

/// Timeout and retry budget for registry I/O on the request path.
///
/// Each attempt is bounded by `timeout`; at most one retry is ever made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub retries: u32,
}

impl CallPolicy {
    pub const MAX_RETRIES: u32 = 1;

    pub fn new(timeout: Duration, retries: u32) -> Self {
        Self {
            timeout,
            retries: retries.min(Self::MAX_RETRIES),
        }
    }

    /// Runs `call` until it succeeds or the attempts are exhausted, returning
    /// the last error. A timed out attempt yields [`RegistryError::Timeout`].
    /// The final failure is left to the caller to report.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RegistryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RegistryError>>,
    {
        let attempts = self.retries.min(Self::MAX_RETRIES) + 1;
        let mut last_error = RegistryError::Timeout(self.timeout);

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => last_error = e,
                Err(_) => last_error = RegistryError::Timeout(self.timeout),
            }

            if attempt < attempts {
                tracing::warn!("{} failed (attempt {}/{}): {}, retrying", operation, attempt, attempts, last_error);
            }
        }

        tracing::debug!("{} failed after {} attempt(s): {}", operation, attempts, last_error);
        Err(last_error)
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), 1)
    }
}
