//! Tracing utilities for query log observability.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! The macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site.

#[cfg(feature = "tracing")]
use std::time::{Duration, Instant};

#[cfg(feature = "tracing")]
use crate::entry::{ParamType, ParamValue};
#[cfg(feature = "tracing")]
use crate::logger::SqlLogger;

/// Emit a debug-level tracing event with the SQL text and parameter count.
///
/// ```ignore
/// querylog_trace_query!(sql, params.map_or(0, <[_]>::len));
/// ```
#[macro_export]
macro_rules! querylog_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(sql = %$sql, params = $param_count, "querylog.start");
    };
}

/// Emit a debug-level tracing event when a logged query finishes.
///
/// ```ignore
/// querylog_trace_stop!(sequence, elapsed);
/// ```
#[macro_export]
macro_rules! querylog_trace_stop {
    ($sequence:expr, $elapsed:expr) => {
        #[cfg(feature = "tracing")]
        ::tracing::debug!(
            sequence = $sequence,
            elapsed_ms = $crate::entry::duration_ms($elapsed),
            "querylog.stop"
        );
    };
}

/// Emit a warn-level tracing event for a lifecycle call that was ignored.
#[macro_export]
macro_rules! querylog_trace_ignored {
    ($reason:literal) => {
        #[cfg(feature = "tracing")]
        ::tracing::warn!(reason = $reason, "querylog.ignored");
    };
}

#[cfg(feature = "tracing")]
/// Logger that forwards every statement to `tracing` instead of collecting it.
///
/// Pairs with an in-memory logger through [`LoggerChain`](crate::LoggerChain)
/// when both a live event stream and an inspectable log are wanted.
#[derive(Debug, Default)]
pub struct TracingLogger {
    start: Option<Instant>,
    sql: Option<String>,
}

#[cfg(feature = "tracing")]
impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "tracing")]
impl SqlLogger for TracingLogger {
    fn start_query(&mut self, sql: &str, params: Option<&[ParamValue]>, types: Option<&[ParamType]>) {
        ::tracing::debug!(
            sql = %sql,
            params = params.map_or(0, <[ParamValue]>::len),
            typed = types.is_some(),
            "querylog.query"
        );
        self.sql = Some(sql.to_owned());
        self.start = Some(Instant::now());
    }

    fn stop_query(&mut self) {
        let Some(start) = self.start.take() else {
            ::tracing::warn!("querylog.query stopped without a matching start");
            return;
        };
        let elapsed: Duration = start.elapsed();
        let sql = self.sql.take().unwrap_or_default();
        ::tracing::debug!(
            sql = %sql,
            elapsed_ms = crate::entry::duration_ms(elapsed),
            "querylog.query"
        );
    }
}
