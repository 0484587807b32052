/*!
 * Distributed Tracing
 * Structured tracing for receive calls using the tracing crate
 *
 * Features:
 * - Trace ID per receive call for correlating handler and waiter logs
 * - JSON-formatted logs for structured parsing
 * - `log` records from the lower network layers folded into the same output
 */

use crate::core::errors::NetResult;
use crate::core::types::ConnId;
use std::time::Instant;
use tracing::{debug, info, span, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - KERNEL_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("KERNEL_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::NONE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Generate a unique trace ID for request correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one scatter-gather receive
pub struct RecvSpan {
    span: Span,
    start: Instant,
    conn: ConnId,
    trace_id: String,
}

impl RecvSpan {
    pub fn new(conn: ConnId, regions: usize, capacity: usize) -> Self {
        let trace_id = generate_trace_id();

        let span = span!(
            Level::DEBUG,
            "recvmsg",
            trace_id = %trace_id,
            conn = %conn,
            regions = regions as u64,
            capacity = capacity as u64,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            conn,
            trace_id,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Record the outcome of the receive
    pub fn record_result(&self, result: &NetResult<usize>) {
        match result {
            Ok(n) => {
                self.span.record("result", *n as u64);
            }
            Err(e) => {
                self.span.record("result", "error");
                self.span.record("error", tracing::field::display(e));
            }
        }
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for RecvSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();

        self.span.record("duration_us", duration.as_micros() as u64);
        debug!(
            trace_id = %self.trace_id,
            conn = %self.conn,
            duration_us = duration.as_micros() as u64,
            "receive completed"
        );
    }
}

/// Helper to create a receive span
#[inline]
pub fn span_recv(conn: ConnId, regions: usize, capacity: usize) -> RecvSpan {
    RecvSpan::new(conn, regions, capacity)
}
