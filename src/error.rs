//! Failure taxonomy shared across the executor, gateway, and lifecycle.
//!
//! Only connection-level trouble is ever retried; everything else is a
//! terminal classification for the current operation. Fatal startup problems
//! (missing roster, zero valid accounts) surface as `anyhow` errors from
//! `main` instead; they are preconditions, not runtime states.

use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum BotError {
    /// Every retry attempt failed at the connection level.
    #[error("request failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The remote delivered a structured error envelope. Not retried.
    #[error("remote refused the request: {0}")]
    Application(String),

    /// Auth was rejected outright. Excludes the account at validation time.
    #[error("credential rejected (HTTP {status})")]
    CredentialRejected { status: u16 },

    /// The battle never reached a terminal status within the wait budget.
    #[error("battle did not resolve within {budget_secs}s")]
    TimedOut { budget_secs: u64 },
}
