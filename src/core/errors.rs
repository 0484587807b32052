/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::ConnId;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use crate::net::config::ConfigError;
pub use crate::net::iob::IobError;

/// Classic errno values for callers sitting on a syscall boundary
pub mod errno {
    pub const EINTR: i32 = 4;
    pub const EBADF: i32 = 9;
    pub const EAGAIN: i32 = 11;
    pub const ENOMEM: i32 = 12;
    pub const EBUSY: i32 = 16;
    pub const EINVAL: i32 = 22;
    pub const ENOTCONN: i32 = 107;
}

/// Network stack errors surfaced to receive callers
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum NetError {
    #[error("Operation would block")]
    #[diagnostic(
        code(net::would_block),
        help("No data was available, or the receive timeout elapsed. Retry or poll.")
    )]
    WouldBlock,

    #[error("Socket is not connected")]
    #[diagnostic(
        code(net::not_connected),
        help("The peer aborted, timed out, or the device went down before any data arrived.")
    )]
    NotConnected,

    #[error("Resource exhausted: {0}")]
    #[diagnostic(
        code(net::resource_exhausted),
        help("All callback registrations for this connection are in use. Retry later.")
    )]
    ResourceExhausted(String),

    #[error("Wait interrupted")]
    #[diagnostic(
        code(net::interrupted),
        help("The receive was cancelled before any data arrived.")
    )]
    Interrupted,

    #[error("Cancel token belongs to another network stack")]
    #[diagnostic(
        code(net::foreign_cancel_token),
        help("Create the token with cancel_token() on the stack being received from.")
    )]
    ForeignCancelToken,

    #[error("Connection {0} not found")]
    #[diagnostic(
        code(net::conn_not_found),
        help("The connection was never opened or has already been released.")
    )]
    ConnNotFound(ConnId),

    #[error("I/O buffer error: {0}")]
    #[diagnostic(transparent)]
    Iob(#[from] IobError),
}

impl NetError {
    /// Negated errno for this error, as a C-style receive would return it
    pub fn errno(&self) -> i32 {
        -match self {
            NetError::WouldBlock => errno::EAGAIN,
            NetError::NotConnected => errno::ENOTCONN,
            NetError::ResourceExhausted(_) => errno::EBUSY,
            NetError::Interrupted => errno::EINTR,
            NetError::ForeignCancelToken => errno::EINVAL,
            NetError::ConnNotFound(_) => errno::EBADF,
            NetError::Iob(_) => errno::ENOMEM,
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            NetError::WouldBlock | NetError::Interrupted | NetError::ResourceExhausted(_)
        )
    }
}

/// Result type for network stack operations
pub type NetResult<T> = Result<T, NetError>;
