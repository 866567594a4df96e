//! Error taxonomy for the synchronisation engines.
//!
//! [`RemoteError`] is a single rejected remote call; it is non-fatal and
//! captured per entity inside copy/reset reports. [`SyncError`] covers the
//! fatal cases that abort an operation before or during execution.

use thiserror::Error;

/// A create/delete/list call rejected by the remote service.
///
/// Clone-able so reports can carry the error per entity while the operation
/// keeps going for the remaining entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The service answered with a non-success status (validation failure,
    /// quota, expired auth, conflict).
    #[error("remote service rejected the request ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Fatal errors surfaced to the caller instead of being recorded in a
/// report. No partial work is performed once one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Reset requested on an account whose configuration does not mark it
    /// resettable. Checked before any deletion begins.
    #[error("account {account_id} is not resettable")]
    NotResettable { account_id: String },

    /// A batch size of zero can never make progress.
    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    /// No account with this alias in the loaded configuration.
    #[error("no account with alias {alias:?} in the config")]
    UnknownAccount { alias: String },

    /// A list call failed while populating an entity store.
    #[error(transparent)]
    Remote(#[from] RemoteError),
}
