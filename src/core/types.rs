/*!
 * Core Types
 * Common types used across the kernel
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Connection identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(pub u32);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn#{}", self.0)
    }
}

/// Callback registration identifier, unique within one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(pub u32);

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cb#{}", self.0)
    }
}

/// Execution unit identifier (the CPU a thread runs on, for RSS hints)
pub type CpuId = u32;

static NEXT_CPU: AtomicU32 = AtomicU32::new(0);

thread_local! {
    static THIS_CPU: CpuId = NEXT_CPU.fetch_add(1, Ordering::Relaxed);
}

/// Id of the execution unit running the caller
///
/// Hosted builds have no CPU numbering, so each thread gets a stable id on
/// first use.
pub fn this_cpu() -> CpuId {
    THIS_CPU.with(|cpu| *cpu)
}
