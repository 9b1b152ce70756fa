//! Error taxonomy for inventory reads, credential storage, and update runs.
//!
//! Timeout and user cancellation are deliberately not errors; they are
//! controlled terminal states (`RunOutcome`) reported via status text.

use thiserror::Error;

use crate::managers::ManagerKind;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UpdateError {
    #[error("no sudo credential is set")]
    MissingCredential,

    #[error("credential store error: {0}")]
    CredentialStore(String),

    #[error("failed to read dock inventory: {0}")]
    InventoryRead(String),

    #[error("{manager} invocation failed: {message}")]
    ManagerInvocation {
        manager: ManagerKind,
        message: String,
    },

    #[error("no supported package managers found")]
    NoManagersFound,
}
