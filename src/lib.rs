//! # querylog
//!
//! In-memory SQL query logging for database access layers.
//!
//! A database layer calls [`SqlLogger::start_query`] right before it
//! dispatches a statement and [`SqlLogger::stop_query`] right after. The
//! loggers in this crate collect those statements with their parameters,
//! execution time and, optionally, the application call-site.
//!
//! ## Quick Start
//!
//! ```rust
//! use querylog::prelude::*;
//!
//! let mut logger = BasicStackLogger::new(SourceCapture::Always);
//!
//! let params = [ParamValue::from(42)];
//! logger.start_query("SELECT * FROM users WHERE id = ?", Some(&params[..]), None);
//! // ... run the statement ...
//! logger.stop_query();
//!
//! for (sequence, entry) in logger.queries() {
//!     println!("#{sequence} {} ({:.3} ms) at {:?}", entry.sql, entry.execution_ms(), entry.query_source);
//! }
//! ```
//!
//! ## Loggers
//!
//! | Logger                      | Call-site            | Feature Flag |
//! |-----------------------------|----------------------|--------------|
//! | `BasicStackLogger`          | per `SourceCapture`  |              |
//! | `SourceAttributingLogger`   | always               |              |
//! | `LoggerChain`               | per member           |              |
//! | `TracingLogger`             | none                 | `tracing`    |
//!
//! With the `rusqlite` feature, [`sqlite::rusqlite::LoggedConnection`] wraps a
//! `rusqlite::Connection` and reports every statement it runs.

#![cfg_attr(docsrs, feature(doc_cfg))]

// Driver wrappers
#[cfg(feature = "rusqlite")]
pub mod sqlite;

// =============================================================================
// Root-level exports
// =============================================================================

/// Result type for querylog operations
pub use querylog_core::error::Result;

/// Error types
pub mod error {
    pub use querylog_core::error::QueryLogError;
}

pub use querylog_core::{
    BasicStackLogger, LoggerChain, LoggerConfig, NullLogger, QueryLogEntry, QueryState,
    SourceAttributingLogger, SourceCapture, SqlLogger,
};

#[cfg(feature = "tracing")]
#[cfg_attr(docsrs, doc(cfg(feature = "tracing")))]
pub use querylog_core::TracingLogger;

// =============================================================================
// Module re-exports
// =============================================================================

/// Logged statement and parameter types.
pub mod entry {
    pub use querylog_core::entry::{
        ParamType, ParamTypes, ParamValue, Params, QueryLogEntry, duration_ms,
    };
}

/// Call-site resolution.
///
/// - `CallerLocation` - `#[track_caller]` location of the `start_query` call (default)
/// - `BacktraceResolver` - walks a captured backtrace
/// - `VendorMarkers` - path substrings that mark library frames
pub mod source {
    pub use querylog_core::source::{
        BacktraceResolver, CallSiteResolver, CallerLocation, QuerySource, UNKNOWN_FILE,
        VendorMarkers, find_query_source,
    };
}

/// Configuration and the `QUERYLOG_*` environment variables.
pub mod config {
    pub use querylog_core::config::{
        ENV_ENABLED, ENV_SOURCE, ENV_VENDOR_MARKERS, LoggerConfig,
    };
}

// =============================================================================
// Prelude
// =============================================================================

pub mod prelude {
    pub use crate::entry::{ParamType, ParamValue, QueryLogEntry};
    pub use crate::source::{CallSiteResolver, QuerySource, VendorMarkers};
    pub use crate::{
        BasicStackLogger, LoggerChain, LoggerConfig, SourceAttributingLogger, SourceCapture,
        SqlLogger,
    };

    #[cfg(feature = "rusqlite")]
    pub use crate::sqlite::rusqlite::LoggedConnection;
}
