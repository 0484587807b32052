/*!
 * I/O Buffers
 *
 * Segmented byte chains drawn from a bounded buffer pool. A chain is owned
 * by exactly one holder at a time (an in-flight packet, a connection's
 * read-ahead slot) and returns its buffers to the pool when dropped.
 */

mod chain;
mod pool;

pub use chain::IobChain;
pub use pool::{IobPool, IobPoolStats};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// I/O buffer errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum IobError {
    #[error("I/O buffer pool exhausted: requested {requested}, available {available}")]
    #[diagnostic(
        code(iob::exhausted),
        help("Drain read-ahead data or raise iob_nbuffers in the network config.")
    )]
    Exhausted { requested: usize, available: usize },

    #[error("Range {offset}+{len} outside chain of {chain_len} bytes")]
    #[diagnostic(code(iob::out_of_range))]
    OutOfRange {
        offset: usize,
        len: usize,
        chain_len: usize,
    },
}

/// Result type for I/O buffer operations
pub type IobResult<T> = Result<T, IobError>;
