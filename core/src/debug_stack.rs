//! In-memory statement logs.
//!
//! [`BasicStackLogger`] collects every statement issued while it is enabled,
//! keyed by a 1-based sequence number. Its [`SourceCapture`] mode decides at
//! construction whether each entry also records the application call-site.
//! [`SourceAttributingLogger`] is the same log with capture always on.
//!
//! ```
//! use querylog_core::{BasicStackLogger, SourceCapture, SqlLogger};
//!
//! let mut logger = BasicStackLogger::new(SourceCapture::Always);
//! logger.start_query("SELECT 1", None, None);
//! logger.stop_query();
//!
//! let entry = logger.get(1).unwrap();
//! assert_eq!(entry.sql, "SELECT 1");
//! assert!(entry.query_source.is_some());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::panic::Location;
use std::str::FromStr;
use std::time::Instant;

use crate::config::LoggerConfig;
use crate::entry::{ParamType, ParamValue, QueryLogEntry};
use crate::error::{QueryLogError, Result};
use crate::logger::SqlLogger;
use crate::source::{CallSiteResolver, CallerLocation, QuerySource};

/// Whether logged entries record their call-site.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SourceCapture {
    /// Never attach a query source
    #[default]
    None,
    /// Attach a query source on every `start_query`
    Always,
}

impl FromStr for SourceCapture {
    type Err = QueryLogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "disabled" | "off" | "0" => Ok(SourceCapture::None),
            "always" | "enabled" | "on" | "1" => Ok(SourceCapture::Always),
            _ => Err(QueryLogError::InvalidSourceCapture(s.to_owned())),
        }
    }
}

impl fmt::Display for SourceCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceCapture::None => "none",
            SourceCapture::Always => "always",
        })
    }
}

/// Lifecycle of the statement a logger is tracking.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// No statement in flight
    #[default]
    Idle,
    /// Between `start_query` and its matching `stop_query`
    Running,
}

/// Collects executed statements with parameters and timing.
///
/// While [`enabled`](Self::enabled) is false both lifecycle calls are no-ops.
/// The flag is read at each call, so a statement started while enabled and
/// stopped while disabled keeps an execution time of zero.
///
/// `stop_query` only finalizes an entry while a statement is
/// [`Running`](QueryState::Running); a stray call leaves the log untouched.
pub struct BasicStackLogger<R = CallerLocation> {
    queries: BTreeMap<u64, QueryLogEntry>,
    enabled: bool,
    start: Option<Instant>,
    current_query: u64,
    state: QueryState,
    capture: SourceCapture,
    resolver: R,
}

impl BasicStackLogger<CallerLocation> {
    pub fn new(capture: SourceCapture) -> Self {
        Self::with_resolver(capture, CallerLocation::default())
    }

    /// Builds a logger from `config`, resolving call-sites with its vendor markers.
    pub fn from_config(config: &LoggerConfig) -> Self {
        let mut logger = Self::with_resolver(
            config.source_capture,
            CallerLocation::new(config.vendor_markers()),
        );
        logger.enabled = config.enabled;
        logger
    }
}

impl Default for BasicStackLogger<CallerLocation> {
    fn default() -> Self {
        Self::new(SourceCapture::None)
    }
}

impl<R: CallSiteResolver> BasicStackLogger<R> {
    pub fn with_resolver(capture: SourceCapture, resolver: R) -> Self {
        Self {
            queries: BTreeMap::new(),
            enabled: true,
            start: None,
            current_query: 0,
            state: QueryState::Idle,
            capture,
            resolver,
        }
    }

    /// Collected entries keyed by sequence number.
    #[inline]
    pub fn queries(&self) -> &BTreeMap<u64, QueryLogEntry> {
        &self.queries
    }

    /// Entry with sequence number `sequence`.
    #[inline]
    pub fn get(&self, sequence: u64) -> Option<&QueryLogEntry> {
        self.queries.get(&sequence)
    }

    /// Copy of the collected entries in call order.
    pub fn snapshot(&self) -> Vec<QueryLogEntry> {
        self.queries.values().cloned().collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Instant captured by the most recent enabled `start_query`.
    #[inline]
    pub fn start(&self) -> Option<Instant> {
        self.start
    }

    /// Sequence number of the most recently started entry, 0 before the first.
    #[inline]
    pub fn current_query(&self) -> u64 {
        self.current_query
    }

    #[inline]
    pub fn state(&self) -> QueryState {
        self.state
    }

    #[inline]
    pub fn source_capture(&self) -> SourceCapture {
        self.capture
    }

    /// Renders the collected entries as a JSON array in call order.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String> {
        let entries: Vec<&QueryLogEntry> = self.queries.values().collect();
        Ok(serde_json::to_string(&entries)?)
    }

    #[track_caller]
    fn resolve_source(&self) -> QuerySource {
        self.resolver
            .resolve(Location::caller())
            .unwrap_or_else(QuerySource::unknown)
    }
}

impl<R: CallSiteResolver> SqlLogger for BasicStackLogger<R> {
    #[track_caller]
    fn start_query(&mut self, sql: &str, params: Option<&[ParamValue]>, types: Option<&[ParamType]>) {
        if !self.enabled {
            return;
        }

        self.start = Some(Instant::now());
        let mut entry = QueryLogEntry::new(sql, params, types);
        if self.capture == SourceCapture::Always {
            entry = entry.with_source(self.resolve_source());
        }

        self.current_query += 1;
        self.queries.insert(self.current_query, entry);
        self.state = QueryState::Running;
        crate::querylog_trace_query!(sql, params.map_or(0, <[ParamValue]>::len));
    }

    fn stop_query(&mut self) {
        if !self.enabled {
            // Closes the statement without timing it.
            self.state = QueryState::Idle;
            return;
        }
        if self.state != QueryState::Running {
            crate::querylog_trace_ignored!("stop_query without a running query");
            return;
        }

        let (Some(start), Some(entry)) = (self.start, self.queries.get_mut(&self.current_query))
        else {
            crate::querylog_trace_ignored!("stop_query without a started entry");
            return;
        };
        entry.execution = start.elapsed();
        self.state = QueryState::Idle;
        crate::querylog_trace_stop!(self.current_query, entry.execution);
    }
}

impl<R> fmt::Debug for BasicStackLogger<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicStackLogger")
            .field("queries", &self.queries.len())
            .field("enabled", &self.enabled)
            .field("current_query", &self.current_query)
            .field("state", &self.state)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

/// A [`BasicStackLogger`] that records the call-site of every statement.
///
/// Read access goes through `Deref`.
#[derive(Debug)]
pub struct SourceAttributingLogger<R = CallerLocation>(BasicStackLogger<R>);

impl SourceAttributingLogger<CallerLocation> {
    pub fn new() -> Self {
        Self(BasicStackLogger::new(SourceCapture::Always))
    }

    /// Builds a logger from `config`; its source capture mode is ignored.
    pub fn from_config(config: &LoggerConfig) -> Self {
        let mut inner = BasicStackLogger::with_resolver(
            SourceCapture::Always,
            CallerLocation::new(config.vendor_markers()),
        );
        inner.enabled = config.enabled;
        Self(inner)
    }
}

impl Default for SourceAttributingLogger<CallerLocation> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: CallSiteResolver> SourceAttributingLogger<R> {
    pub fn with_resolver(resolver: R) -> Self {
        Self(BasicStackLogger::with_resolver(SourceCapture::Always, resolver))
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.0.set_enabled(enabled);
    }

    pub fn into_inner(self) -> BasicStackLogger<R> {
        self.0
    }
}

impl<R> Deref for SourceAttributingLogger<R> {
    type Target = BasicStackLogger<R>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<R: CallSiteResolver> SqlLogger for SourceAttributingLogger<R> {
    #[track_caller]
    fn start_query(&mut self, sql: &str, params: Option<&[ParamValue]>, types: Option<&[ParamType]>) {
        self.0.start_query(sql, params, types);
    }

    fn stop_query(&mut self) {
        self.0.stop_query();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::source::VendorMarkers;

    fn run(logger: &mut impl SqlLogger, sql: &str) {
        logger.start_query(sql, None, None);
        logger.stop_query();
    }

    #[test]
    fn test_sequence_numbers_follow_call_order() {
        let mut logger = BasicStackLogger::default();
        for sql in ["SELECT 1", "SELECT 2", "SELECT 3"] {
            run(&mut logger, sql);
        }

        let keys: Vec<u64> = logger.queries().keys().copied().collect();
        assert_eq!(keys, vec![1, 2, 3]);
        assert_eq!(logger.current_query(), 3);
        assert_eq!(logger.get(2).unwrap().sql, "SELECT 2");
        assert_eq!(logger.state(), QueryState::Idle);
    }

    #[test]
    fn test_stop_records_elapsed_time() {
        let mut logger = BasicStackLogger::default();
        logger.start_query("SELECT sleep", None, None);
        std::thread::sleep(Duration::from_millis(5));
        logger.stop_query();

        let entry = logger.get(1).unwrap();
        assert!(entry.execution >= Duration::from_millis(5));
        assert!(entry.execution_ms() >= 5.0);
    }

    #[test]
    fn test_entry_is_zero_while_running() {
        let mut logger = BasicStackLogger::default();
        logger.start_query("SELECT 1", None, None);

        assert_eq!(logger.state(), QueryState::Running);
        assert!(logger.start().is_some());
        assert_eq!(logger.get(1).unwrap().execution, Duration::ZERO);
    }

    #[test]
    fn test_disabled_logger_records_nothing() {
        let mut logger = BasicStackLogger::new(SourceCapture::Always);
        logger.set_enabled(false);
        for _ in 0..3 {
            run(&mut logger, "SELECT 1");
        }

        assert!(logger.is_empty());
        assert_eq!(logger.current_query(), 0);
        assert!(logger.start().is_none());
    }

    #[test]
    fn test_disabled_before_stop_leaves_zero() {
        let mut logger = BasicStackLogger::default();
        logger.start_query("SELECT 1", None, None);
        logger.set_enabled(false);
        logger.stop_query();

        assert_eq!(logger.len(), 1);
        assert_eq!(logger.get(1).unwrap().execution, Duration::ZERO);
        assert_eq!(logger.state(), QueryState::Idle);
    }

    #[test]
    fn test_stop_while_disabled_closes_the_statement() {
        let mut logger = BasicStackLogger::default();
        logger.start_query("SELECT 1", None, None);
        logger.set_enabled(false);
        logger.stop_query();
        logger.set_enabled(true);
        std::thread::sleep(Duration::from_millis(20));
        logger.stop_query();

        assert_eq!(logger.len(), 1);
        assert_eq!(logger.get(1).unwrap().execution, Duration::ZERO);
        assert_eq!(logger.state(), QueryState::Idle);
    }

    #[test]
    fn test_stray_stop_is_ignored() {
        let mut logger = BasicStackLogger::default();
        logger.stop_query();
        assert!(logger.is_empty());

        run(&mut logger, "SELECT 1");
        let finished = logger.get(1).unwrap().execution;
        logger.stop_query();
        assert_eq!(logger.get(1).unwrap().execution, finished);
        assert_eq!(logger.len(), 1);
    }

    #[test]
    fn test_enabled_only_at_stop_keeps_previous_timing() {
        let mut logger = BasicStackLogger::default();
        run(&mut logger, "SELECT 1");
        let finished = logger.get(1).unwrap().execution;

        logger.set_enabled(false);
        logger.start_query("SELECT 2", None, None);
        logger.set_enabled(true);
        std::thread::sleep(Duration::from_millis(2));
        logger.stop_query();

        assert_eq!(logger.len(), 1);
        assert_eq!(logger.get(1).unwrap().execution, finished);
    }

    #[test]
    fn test_source_capture_modes() {
        let mut without = BasicStackLogger::new(SourceCapture::None);
        let mut with = BasicStackLogger::new(SourceCapture::Always);
        for sql in ["SELECT 1", "SELECT 2"] {
            run(&mut without, sql);
            run(&mut with, sql);
        }

        assert!(without.queries().values().all(|e| e.query_source.is_none()));
        assert!(with.queries().values().all(|e| e.query_source.is_some()));
    }

    #[test]
    fn test_caller_location_points_at_call_site() {
        let mut logger = BasicStackLogger::new(SourceCapture::Always);
        let line = line!() + 1;
        logger.start_query("SELECT 1", None, None);
        logger.stop_query();

        let source = logger.get(1).unwrap().query_source.clone().unwrap();
        assert_eq!(source, QuerySource::new(file!(), line));
    }

    #[test]
    fn test_vendor_caller_resolves_to_unknown() {
        let resolver = CallerLocation::new(VendorMarkers::new(["debug_stack.rs"]));
        let mut logger = BasicStackLogger::with_resolver(SourceCapture::Always, resolver);
        run(&mut logger, "SELECT 1");

        assert_eq!(
            logger.get(1).unwrap().query_source,
            Some(QuerySource::unknown())
        );
    }

    #[test]
    fn test_source_attributing_logger_always_captures() {
        let resolver = |_: &'static Location<'static>| Some(QuerySource::new("app.rs", 12));
        let mut logger = SourceAttributingLogger::with_resolver(resolver);
        run(&mut logger, "SELECT 1");
        logger.set_enabled(false);
        run(&mut logger, "SELECT 2");

        assert_eq!(logger.len(), 1);
        assert_eq!(logger.source_capture(), SourceCapture::Always);
        assert_eq!(
            logger.get(1).unwrap().query_source,
            Some(QuerySource::new("app.rs", 12))
        );

        let mut inner = logger.into_inner();
        assert_eq!(inner.source_capture(), SourceCapture::Always);
        assert!(!inner.enabled());
        inner.set_enabled(true);
        run(&mut inner, "SELECT 3");
        assert_eq!(
            inner.get(2).unwrap().query_source,
            Some(QuerySource::new("app.rs", 12))
        );
    }

    #[test]
    fn test_params_and_types_are_copied() {
        let params = [ParamValue::from(42), ParamValue::from("bob")];
        let types = [ParamType::new("integer"), ParamType::new("text")];
        let mut logger = BasicStackLogger::default();
        logger.start_query("SELECT * FROM users WHERE id = ? AND name = ?", Some(&params[..]), Some(&types[..]));
        logger.stop_query();

        let entry = &logger.snapshot()[0];
        assert_eq!(entry.params.as_deref(), Some(&params[..]));
        assert_eq!(entry.types.as_deref(), Some(&types[..]));
    }

    #[test]
    fn test_source_capture_from_str() {
        assert_eq!("always".parse::<SourceCapture>().unwrap(), SourceCapture::Always);
        assert_eq!(" Enabled ".parse::<SourceCapture>().unwrap(), SourceCapture::Always);
        assert_eq!("off".parse::<SourceCapture>().unwrap(), SourceCapture::None);
        assert_eq!(
            "sometimes".parse::<SourceCapture>(),
            Err(QueryLogError::InvalidSourceCapture("sometimes".to_string()))
        );
    }

    #[test]
    fn test_from_config() {
        let config = LoggerConfig::new()
            .with_enabled(false)
            .with_source_capture(SourceCapture::Always);
        let logger = BasicStackLogger::from_config(&config);
        assert!(!logger.enabled());
        assert_eq!(logger.source_capture(), SourceCapture::Always);

        let attributing = SourceAttributingLogger::from_config(&LoggerConfig::new());
        assert!(attributing.enabled());
        assert_eq!(attributing.source_capture(), SourceCapture::Always);
    }
}
