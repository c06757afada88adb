use crate::entry::{ParamType, ParamValue};
use crate::logger::SqlLogger;

/// Forwards every event to each registered logger in registration order.
///
/// ```
/// use querylog_core::{BasicStackLogger, LoggerChain, SourceCapture, SqlLogger};
///
/// let mut plain = BasicStackLogger::new(SourceCapture::None);
/// let mut sourced = BasicStackLogger::new(SourceCapture::Always);
/// {
///     let mut chain = LoggerChain::new().with(&mut plain).with(&mut sourced);
///     chain.start_query("SELECT 1", None, None);
///     chain.stop_query();
/// }
/// assert_eq!(plain.len(), 1);
/// assert_eq!(sourced.len(), 1);
/// ```
#[derive(Default)]
pub struct LoggerChain<'a> {
    loggers: Vec<Box<dyn SqlLogger + 'a>>,
}

impl<'a> LoggerChain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_logger(&mut self, logger: impl SqlLogger + 'a) {
        self.loggers.push(Box::new(logger));
    }

    pub fn with(mut self, logger: impl SqlLogger + 'a) -> Self {
        self.add_logger(logger);
        self
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }
}

impl SqlLogger for LoggerChain<'_> {
    #[track_caller]
    fn start_query(&mut self, sql: &str, params: Option<&[ParamValue]>, types: Option<&[ParamType]>) {
        for logger in &mut self.loggers {
            logger.start_query(sql, params, types);
        }
    }

    fn stop_query(&mut self) {
        for logger in &mut self.loggers {
            logger.stop_query();
        }
    }
}

impl std::fmt::Debug for LoggerChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerChain")
            .field("loggers", &self.loggers.len())
            .finish()
    }
}
