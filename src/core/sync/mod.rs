/*!
 * Synchronization Primitives
 *
 * The coarse network lock is a [`Monitor`]: a `parking_lot` mutex paired
 * with a condition variable. Blocking receivers suspend on it, releasing the
 * lock so the network service can deliver events, and are woken by a
 * broadcast after each delivery.
 *
 * # Use Cases
 *
 * - **Receive waits**: block until a completion handler posts the request
 * - **Cancellation**: interrupt a suspended receiver from another thread
 */

mod cancel;
mod monitor;

pub use cancel::{CancelToken, Notify};
pub use monitor::{Monitor, MonitorGuard, WaitOutcome};
