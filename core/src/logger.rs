use crate::entry::{ParamType, ParamValue};

/// Receives statement lifecycle events from a database layer.
///
/// The database layer calls [`start_query`](SqlLogger::start_query) right
/// before dispatching a statement and [`stop_query`](SqlLogger::stop_query)
/// right after it completes. Neither call can fail.
///
/// `start_query` is `#[track_caller]`: the location of the call is available
/// to the implementation through [`Location::caller`](std::panic::Location::caller).
pub trait SqlLogger {
    /// A statement is about to execute. `types`, when present, runs parallel to `params`.
    #[track_caller]
    fn start_query(&mut self, sql: &str, params: Option<&[ParamValue]>, types: Option<&[ParamType]>);

    /// The most recently started statement has finished.
    fn stop_query(&mut self);

    /// Runs `f` between a `start_query`/`stop_query` pair.
    ///
    /// `stop_query` runs whether `f` returns `Ok` or `Err`.
    #[track_caller]
    fn log<T, F>(
        &mut self,
        sql: &str,
        params: Option<&[ParamValue]>,
        types: Option<&[ParamType]>,
        f: F,
    ) -> T
    where
        Self: Sized,
        F: FnOnce() -> T,
    {
        self.start_query(sql, params, types);
        let out = f();
        self.stop_query();
        out
    }
}

impl<L: SqlLogger + ?Sized> SqlLogger for &mut L {
    #[track_caller]
    fn start_query(&mut self, sql: &str, params: Option<&[ParamValue]>, types: Option<&[ParamType]>) {
        (**self).start_query(sql, params, types);
    }

    fn stop_query(&mut self) {
        (**self).stop_query();
    }
}

impl<L: SqlLogger + ?Sized> SqlLogger for Box<L> {
    #[track_caller]
    fn start_query(&mut self, sql: &str, params: Option<&[ParamValue]>, types: Option<&[ParamType]>) {
        (**self).start_query(sql, params, types);
    }

    fn stop_query(&mut self) {
        (**self).stop_query();
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl SqlLogger for NullLogger {
    fn start_query(&mut self, _sql: &str, _params: Option<&[ParamValue]>, _types: Option<&[ParamType]>) {}

    fn stop_query(&mut self) {}
}
