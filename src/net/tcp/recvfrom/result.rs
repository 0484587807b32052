/*!
 * Receive Result Reconciliation
 */

use super::state::RecvRequest;
use crate::core::errors::{NetError, NetResult};
use crate::core::sync::WaitOutcome;

/// Map a monitor wait outcome to the receive error it stands for
pub fn wait_result(outcome: WaitOutcome) -> NetResult<()> {
    match outcome {
        WaitOutcome::Signaled => Ok(()),
        WaitOutcome::TimedOut => Err(NetError::WouldBlock),
        WaitOutcome::Interrupted => Err(NetError::Interrupted),
    }
}

/// Final result of a receive that waited
///
/// Any accumulated bytes win over every error. Otherwise the handler's
/// error takes precedence over the wait's.
pub fn tcp_recvfrom_result(wait: NetResult<()>, req: &RecvRequest) -> NetResult<usize> {
    if req.recvlen > 0 {
        return Ok(req.recvlen);
    }

    match &req.result {
        Some(e) => Err(e.clone()),
        None => wait.map(|()| 0),
    }
}
