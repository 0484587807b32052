/*!
 * Monitoring
 * Structured tracing setup and per-call receive spans
 */

mod tracer;

pub use tracer::{generate_trace_id, init_tracing, span_recv, RecvSpan};
