use crate::broker::BrokerResult;
use crate::connection_session::errors::{SessionError, SessionResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Bounds every broker call by a timeout and the session's cancellation token.
#[derive(Debug, Clone)]
pub(crate) struct CallGuard {
    timeout: Duration,
    token: CancellationToken,
}

impl CallGuard {
    pub(crate) fn new(timeout: Duration, token: CancellationToken) -> Self {
        Self { timeout, token }
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub(crate) async fn run<T, F>(&self, operation: &'static str, call: F) -> SessionResult<T>
    where
        F: Future<Output = BrokerResult<T>>,
    {
        self.run_for(self.timeout, operation, call).await
    }

    /// Timeout-only variant for releasing handles, which must still happen
    /// after cancellation.
    pub(crate) async fn run_cleanup<F>(&self, operation: &'static str, call: F) -> SessionResult<()>
    where
        F: Future<Output = BrokerResult<()>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(SessionError::from),
            Err(_) => Err(SessionError::OperationTimeout {
                operation,
                after: self.timeout,
            }),
        }
    }

    /// Like [`run`](Self::run) with an explicit time limit.
    pub(crate) async fn run_for<T, F>(
        &self,
        limit: Duration,
        operation: &'static str,
        call: F,
    ) -> SessionResult<T>
    where
        F: Future<Output = BrokerResult<T>>,
    {
        if self.token.is_cancelled() {
            return Err(SessionError::Cancelled { operation });
        }

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                log::debug!("{operation} cancelled");
                Err(SessionError::Cancelled { operation })
            }
            outcome = tokio::time::timeout(limit, call) => match outcome {
                Ok(result) => result.map_err(SessionError::from),
                Err(_) => {
                    log::warn!("{operation} timed out after {limit:?}");
                    Err(SessionError::OperationTimeout { operation, after: limit })
                }
            },
        }
    }
}
