//! Call-site attribution for logged statements.
//!
//! A [`CallSiteResolver`] turns the current execution context into the
//! `{file, line}` of the application code that issued a statement. Frames that
//! live in third-party or toolchain code are skipped according to a
//! [`VendorMarkers`] policy.
//!
//! Two resolvers ship with the crate:
//!
//! - [`CallerLocation`] uses the `#[track_caller]` location handed down by
//!   [`SqlLogger::start_query`](crate::SqlLogger::start_query). No stack walk.
//! - [`BacktraceResolver`] captures a [`Backtrace`] and walks it from the
//!   innermost frame outward.

use std::backtrace::Backtrace;
use std::fmt;
use std::panic::Location;

use compact_str::CompactString;

/// File reported when no application frame could be found.
pub const UNKNOWN_FILE: &str = "*unknown*";

/// Where in application code a statement was issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct QuerySource {
    pub file: String,
    pub line: u32,
}

impl QuerySource {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The `{"*unknown*", 0}` sentinel.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN_FILE, 0)
    }

    pub fn is_unknown(&self) -> bool {
        self.file == UNKNOWN_FILE && self.line == 0
    }
}

impl From<&Location<'_>> for QuerySource {
    fn from(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Path substrings that identify library code.
///
/// Matching is case-insensitive and treats `\` as `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorMarkers {
    markers: Vec<CompactString>,
}

impl VendorMarkers {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(|m| normalize(m.as_ref()))
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    /// No markers: every frame counts as application code.
    pub fn none() -> Self {
        Self {
            markers: Vec::new(),
        }
    }

    pub fn is_vendor(&self, path: &str) -> bool {
        if self.markers.is_empty() {
            return false;
        }
        let path = normalize(path);
        self.markers.iter().any(|m| path.contains(m.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(CompactString::as_str)
    }
}

impl Default for VendorMarkers {
    /// `vendor` plus the cargo registry, cargo git checkouts and the toolchain sources.
    fn default() -> Self {
        Self::new(["vendor", ".cargo/registry", ".cargo/git", "/rustc/"])
    }
}

fn normalize(s: &str) -> CompactString {
    s.chars()
        .map(|c| if c == '\\' { '/' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Returns the first frame, innermost first, that is not library code, or the
/// unknown sentinel.
pub fn find_query_source<I>(frames: I, markers: &VendorMarkers) -> QuerySource
where
    I: IntoIterator<Item = QuerySource>,
{
    frames
        .into_iter()
        .find(|frame| !markers.is_vendor(&frame.file))
        .unwrap_or_else(QuerySource::unknown)
}

/// Resolves the call-site of the statement currently being logged.
///
/// `caller` is the `#[track_caller]` location of the `start_query` call.
/// Returning `None` records the unknown sentinel.
pub trait CallSiteResolver {
    fn resolve(&self, caller: &'static Location<'static>) -> Option<QuerySource>;
}

impl<F> CallSiteResolver for F
where
    F: Fn(&'static Location<'static>) -> Option<QuerySource>,
{
    fn resolve(&self, caller: &'static Location<'static>) -> Option<QuerySource> {
        self(caller)
    }
}

/// Attributes statements to the location that called `start_query`.
///
/// Database layers that mark their own entry points `#[track_caller]` push
/// this location out into application code.
#[derive(Debug, Clone, Default)]
pub struct CallerLocation {
    markers: VendorMarkers,
}

impl CallerLocation {
    pub fn new(markers: VendorMarkers) -> Self {
        Self { markers }
    }
}

impl CallSiteResolver for CallerLocation {
    fn resolve(&self, caller: &'static Location<'static>) -> Option<QuerySource> {
        (!self.markers.is_vendor(caller.file())).then(|| QuerySource::from(caller))
    }
}

/// Walks a captured [`Backtrace`] for the first application frame.
///
/// Frames belonging to the logging crates are always skipped. File and line data
/// require debug info; without it every statement resolves to the sentinel.
///
/// Frames are read from the `Display` output of [`Backtrace`], whose format std
/// leaves unspecified. A toolchain that renders frames differently degrades this
/// resolver to the sentinel. [`CallerLocation`] does not depend on that format.
#[derive(Debug, Clone, Default)]
pub struct BacktraceResolver {
    markers: VendorMarkers,
}

impl BacktraceResolver {
    pub fn new(markers: VendorMarkers) -> Self {
        Self { markers }
    }
}

impl CallSiteResolver for BacktraceResolver {
    fn resolve(&self, _caller: &'static Location<'static>) -> Option<QuerySource> {
        let rendered = Backtrace::force_capture().to_string();
        let source = find_query_source(backtrace_frames(&rendered), &self.markers);
        (!source.is_unknown()).then_some(source)
    }
}

/// Symbol prefixes of the logging crates themselves.
const OWN_CRATES: [&str; 2] = ["querylog_core::", "querylog::"];

/// Parses the rendered form of a [`Backtrace`] into frames, innermost first,
/// dropping frames without location info and frames of the logging crates.
///
/// ```text
///    4: app::handlers::list_users
///              at ./src/handlers.rs:42:9
/// ```
pub(crate) fn backtrace_frames(rendered: &str) -> impl Iterator<Item = QuerySource> + '_ {
    let mut own_frame = false;
    rendered.lines().filter_map(move |line| {
        let line = line.trim();
        match line.strip_prefix("at ") {
            Some(location) if !own_frame => parse_location(location),
            Some(_) => None,
            None => {
                own_frame = OWN_CRATES.iter().any(|krate| line.contains(krate));
                None
            }
        }
    })
}

fn parse_location(location: &str) -> Option<QuerySource> {
    let mut parts = location.rsplitn(3, ':');
    let _column = parts.next()?;
    let line = parts.next()?.parse().ok()?;
    let file = parts.next()?;
    Some(QuerySource::new(file, line))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(file: &str, line: u32) -> QuerySource {
        QuerySource::new(file, line)
    }

    #[test]
    fn test_single_application_frame_is_returned_verbatim() {
        let frames = vec![
            frame("/srv/app/vendor/dbal/src/logger.rs", 10),
            frame("/srv/app/vendor/dbal/src/connection.rs", 20),
            frame("/srv/app/src/repository/users.rs", 42),
            frame("/srv/app/vendor/framework/kernel.rs", 99),
        ];

        let source = find_query_source(frames, &VendorMarkers::new(["vendor"]));
        assert_eq!(source, frame("/srv/app/src/repository/users.rs", 42));
    }

    #[test]
    fn test_all_vendor_frames_yield_sentinel() {
        let frames = vec![frame("/a/vendor/x.rs", 1), frame("/b/vendor/y.rs", 2)];

        let source = find_query_source(frames, &VendorMarkers::new(["vendor"]));
        assert_eq!(source, QuerySource::unknown());
        assert!(source.is_unknown());
    }

    #[test]
    fn test_empty_stack_yields_sentinel() {
        let source = find_query_source(Vec::new(), &VendorMarkers::default());
        assert_eq!(source, QuerySource::new("*unknown*", 0));
    }

    #[test]
    fn test_markers_are_case_insensitive() {
        let markers = VendorMarkers::new(["vendor"]);
        assert!(markers.is_vendor("/srv/app/Vendor/lib.rs"));
        assert!(markers.is_vendor("C:\\Projects\\VENDOR\\lib.rs"));
        assert!(!markers.is_vendor("/srv/app/src/lib.rs"));
    }

    #[test]
    fn test_default_markers_cover_cargo_and_toolchain() {
        let markers = VendorMarkers::default();
        assert!(markers.is_vendor(
            "/home/u/.cargo/registry/src/index.crates.io-6f17d22bba15001f/rusqlite-0.37.0/src/lib.rs"
        ));
        assert!(markers.is_vendor("/rustc/90b35a6239c3d8bdabc530a6a0816f7ff89a0aaf/library/core/src/ops/function.rs"));
        assert!(!markers.is_vendor("./src/main.rs"));
    }

    #[test]
    fn test_no_markers_accepts_first_frame() {
        let frames = vec![frame("/a/vendor/x.rs", 1), frame("/b/y.rs", 2)];
        assert_eq!(
            find_query_source(frames, &VendorMarkers::none()),
            frame("/a/vendor/x.rs", 1)
        );
    }

    #[test]
    fn test_parse_rendered_backtrace() {
        let rendered = "\
   0: std::backtrace::Backtrace::force_capture
             at /rustc/abc/library/std/src/backtrace.rs:312:13
   1: querylog_core::source::BacktraceResolver::resolve
             at ./core/src/source.rs:180:24
   2: <querylog_core::debug_stack::BasicStackLogger<R> as querylog_core::logger::SqlLogger>::start_query
             at ./core/src/debug_stack.rs:120:30
   3: app::users::load
             at ./src/users.rs:17:5
   4: app::main
   5: core::ops::function::FnOnce::call_once
             at /rustc/abc/library/core/src/ops/function.rs:250:5";

        let frames: Vec<_> = backtrace_frames(rendered).collect();
        assert_eq!(
            frames,
            vec![
                frame("/rustc/abc/library/std/src/backtrace.rs", 312),
                frame("./src/users.rs", 17),
                frame("/rustc/abc/library/core/src/ops/function.rs", 250),
            ]
        );

        let source = find_query_source(frames, &VendorMarkers::default());
        assert_eq!(source, frame("./src/users.rs", 17));
    }

    #[test]
    fn test_parse_location_rejects_garbage() {
        assert_eq!(parse_location("no line info"), None);
        assert_eq!(parse_location("file.rs:x:1"), None);
        assert_eq!(
            parse_location("C:\\src\\main.rs:3:7"),
            Some(frame("C:\\src\\main.rs", 3))
        );
    }

    #[test]
    fn test_caller_location_filters_vendor_paths() {
        let here = Location::caller();
        let resolver = CallerLocation::default();
        assert_eq!(resolver.resolve(here), Some(QuerySource::from(here)));

        let strict = CallerLocation::new(VendorMarkers::new(["source.rs"]));
        assert_eq!(strict.resolve(here), None);
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |_: &'static Location<'static>| Some(frame("synthetic.rs", 7));
        assert_eq!(
            resolver.resolve(Location::caller()),
            Some(frame("synthetic.rs", 7))
        );
    }
}
