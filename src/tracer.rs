//! [`QueryLogger`] implementation that reports through `tracing`.

use std::fmt;
use std::time::{Duration, Instant};

use sea_orm::DbErr;
use tracing::subscriber::NoSubscriber;
use tracing::Dispatch;

use crate::config::{LoggerConfig, DEFAULT_SLOW_THRESHOLD};
use crate::error::ConfigError;
use crate::handle::{LogHandle, QueryFields};
use crate::logger::{LogLevel, QueryLogger, SqlThunk};
use crate::resolver::FrameResolver;

/// Reports finished queries as `tracing` events attributed to the calling
/// application code.
///
/// For each query:
///
/// | Condition | Level | Message |
/// |-----------|-------|---------|
/// | `DbErr::RecordNotFound` | WARN | `record not found` |
/// | any other error | ERROR | `query failed`, with `error` |
/// | elapsed above `slow_threshold` | WARN | `slow query` |
/// | `log_queries` set | DEBUG | `query` |
///
/// Conditions are independent, so one query can produce several records. Every
/// record carries `sql`, `time` and `rows`, plus `caller` when the call site was
/// resolved.
///
/// The logger is never mutated after construction; clone it freely and share it
/// between connections and threads.
///
/// # Example
///
/// ```rust,ignore
/// use sea_orm_tracelog::TracingLogger;
///
/// tracing_subscriber::fmt::init();
/// let mut logger = TracingLogger::from_default(false)?;
/// logger.slow_threshold = Duration::from_millis(50);
/// ```
#[derive(Debug, Clone)]
pub struct TracingLogger {
    dispatch: Dispatch,
    /// Queries slower than this get a WARN record. Zero disables the check.
    pub slow_threshold: Duration,
    /// Emit a DEBUG record for every query.
    pub log_queries: bool,
    resolver: FrameResolver,
}

impl TracingLogger {
    /// Create a logger writing to `dispatch` with the default slow-query threshold.
    pub fn new(dispatch: Dispatch, log_queries: bool) -> Result<Self, ConfigError> {
        Self::from_parts(
            dispatch,
            DEFAULT_SLOW_THRESHOLD,
            log_queries,
            FrameResolver::default(),
        )
    }

    /// Create a logger writing to the dispatcher that is the default right now.
    ///
    /// Fails with [`ConfigError::NoSubscriber`] if no subscriber has been installed,
    /// so install one (e.g. `tracing_subscriber::fmt::init()`) first.
    pub fn from_default(log_queries: bool) -> Result<Self, ConfigError> {
        let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
        Self::new(dispatch, log_queries)
    }

    /// Build a logger from a full configuration.
    pub fn with_config(config: LoggerConfig) -> Result<Self, ConfigError> {
        config.build()
    }

    pub(crate) fn from_parts(
        dispatch: Dispatch,
        slow_threshold: Duration,
        log_queries: bool,
        resolver: FrameResolver,
    ) -> Result<Self, ConfigError> {
        if dispatch.is::<NoSubscriber>() {
            return Err(ConfigError::NoSubscriber);
        }
        Ok(Self {
            dispatch,
            slow_threshold,
            log_queries,
            resolver,
        })
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    fn is_slow(&self, elapsed: Duration) -> bool {
        !self.slow_threshold.is_zero() && elapsed > self.slow_threshold
    }

    fn handle(&self) -> LogHandle<'_> {
        LogHandle::new(&self.dispatch, self.resolver.resolve())
    }

    fn report(&self, elapsed: Duration, query: SqlThunk<'_>, err: Option<&DbErr>) {
        let (sql, rows) = query();

        let slow = self.is_slow(elapsed);
        if err.is_none() && !slow && !self.log_queries {
            return;
        }

        let fields = QueryFields::new(sql, elapsed, rows);
        let handle = self.handle();

        match err {
            Some(DbErr::RecordNotFound(_)) => handle.record_not_found(&fields),
            Some(err) => handle.query_failed(&fields, err),
            None => {}
        }

        if slow {
            handle.slow_query(&fields);
        }

        if self.log_queries {
            handle.query(&fields);
        }
    }
}

impl QueryLogger for TracingLogger {
    /// Levels are not tracked; this returns an identical logger.
    fn log_mode(&self, _level: LogLevel) -> Box<dyn QueryLogger> {
        Box::new(self.clone())
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        self.handle().debug(args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.handle().warn(args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        self.handle().error(args);
    }

    fn trace(&self, begin: Instant, query: SqlThunk<'_>, err: Option<&DbErr>) {
        let elapsed = begin.elapsed();
        self.report(elapsed, query, err);
    }
}
