//! Core types for in-memory SQL query logging.
//!
//! A database layer reports each statement through the [`SqlLogger`]
//! contract. [`BasicStackLogger`] and [`SourceAttributingLogger`] collect the
//! reported statements with their parameters, timing and (optionally) the
//! application call-site that issued them.

pub mod chain;
pub mod config;
pub mod debug_stack;
pub mod entry;
pub mod error;
pub mod logger;
pub mod source;
pub mod tracing;

pub use chain::LoggerChain;
pub use config::LoggerConfig;
pub use debug_stack::{BasicStackLogger, QueryState, SourceAttributingLogger, SourceCapture};
pub use entry::{ParamType, ParamTypes, ParamValue, Params, QueryLogEntry};
pub use logger::{NullLogger, SqlLogger};
pub use source::{
    BacktraceResolver, CallSiteResolver, CallerLocation, QuerySource, VendorMarkers,
    find_query_source,
};

#[cfg(feature = "tracing")]
pub use crate::tracing::TracingLogger;
