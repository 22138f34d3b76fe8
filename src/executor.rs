//! Bounded-retry request execution.
//!
//! Wraps a [`Transport`] with a fixed attempt budget and capped exponential
//! backoff. Retries fire only on connection-level failures; a delivered
//! response is returned immediately no matter its HTTP status.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::Sleeper;
use crate::error::BotError;
use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

pub struct RequestExecutor<T: Transport> {
    transport: T,
    max_attempts: u32,
    backoff_cap: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl<T: Transport> RequestExecutor<T> {
    /// `backoff_cap` bounds the exponential wait; the per-request timeout is
    /// the natural choice so retry pauses never dwarf the requests themselves.
    pub fn new(
        transport: T,
        max_attempts: u32,
        backoff_cap: Duration,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            transport,
            max_attempts: max_attempts.max(1),
            backoff_cap,
            sleeper,
        }
    }

    pub fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, BotError> {
        let mut last: Option<TransportError> = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                self.sleeper.sleep(self.backoff(attempt));
            }
            match self.transport.send(request) {
                Ok(response) => return Ok(response),
                Err(err) => {
                    debug!(
                        path = %request.path,
                        attempt,
                        kind = %err.kind,
                        "transport attempt failed"
                    );
                    last = Some(err);
                }
            }
        }

        // max_attempts >= 1, so at least one send ran and recorded an error.
        let source = last.unwrap_or(TransportError {
            kind: "Unknown".to_string(),
            message: "no attempt made".to_string(),
        });
        warn!(
            path = %request.path,
            attempts = self.max_attempts,
            kind = %source.kind,
            "request exhausted all retries"
        );
        Err(BotError::Exhausted {
            attempts: self.max_attempts,
            source,
        })
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// 1s, 2s, 4s, ... before attempts 2, 3, 4, ..., capped.
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = (attempt - 2).min(16);
        Duration::from_secs(1u64 << exponent).min(self.backoff_cap)
    }
}
