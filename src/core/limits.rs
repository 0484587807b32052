/*!
 * System Limits and Constants
 *
 * Centralized location for network-stack limits and defaults.
 * Organized by subsystem so the config layer and the tests agree on them.
 *
 * ## Conventions
 * - Performance-relevant constants are marked with [PERF]
 * - Values mirroring classic BSD/POSIX behavior are marked with [POSIX-COMPAT]
 */

use std::time::Duration;

// =============================================================================
// I/O BUFFER POOL
// =============================================================================

/// Payload bytes carried by a single I/O buffer
/// [PERF] Small enough that a full-size segment spans a handful of buffers
pub const DEFAULT_IOB_BUFSIZE: usize = 196;

/// Number of I/O buffers in the shared pool
/// Every buffered byte in the stack (in flight or read-ahead) draws from here
pub const DEFAULT_IOB_NBUFFERS: usize = 256;

// =============================================================================
// TCP CONNECTIONS
// =============================================================================

/// Maximum bytes a connection may hold in its read-ahead chain
pub const DEFAULT_READAHEAD_LIMIT: usize = 16 * 1024;

/// Callback registrations available to each connection
/// One per waiting receiver plus a few connection monitors
pub const DEFAULT_MAX_CALLBACKS: usize = 8;

/// Default maximum segment size used for window update thresholds
/// [POSIX-COMPAT] RFC 1122 default MSS for IPv4
pub const DEFAULT_TCP_MSS: usize = 536;

/// First connection id handed out by a stack
pub const FIRST_CONN_ID: u32 = 1;

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Default receive timeout (None = wait until data or disconnect)
/// [POSIX-COMPAT] SO_RCVTIMEO defaults to zero, meaning block forever
pub const DEFAULT_RECV_TIMEOUT: Option<Duration> = None;

/// Upper bound accepted for a configured receive timeout
pub const MAX_RECV_TIMEOUT: Duration = Duration::from_secs(3600);

// =============================================================================
// NETWORK SERVICE
// =============================================================================

/// Pending device events the network service queue accepts before senders block
pub const NET_SERVICE_QUEUE_DEPTH: usize = 1024;

/// Environment variable naming a JSON config file
pub const NET_CONFIG_ENV: &str = "KERNEL_NET_CONFIG";
