//! The query-logging contract between query execution and a logging backend.

use std::fmt;
use std::time::Instant;

use sea_orm::DbErr;

/// Deferred producer of the executed SQL text and the affected row count.
///
/// Row counts are `-1` when the operation cannot report one.
pub type SqlThunk<'a> = Box<dyn FnOnce() -> (String, i64) + 'a>;

/// Severity levels a query logger can be switched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Silent,
    Error,
    Warn,
    #[default]
    Info,
}

/// Receives query notifications from [`TracedConnection`](crate::TracedConnection).
///
/// Implementations are shared across every in-flight query and are called
/// concurrently, so they must be `Send + Sync`. No method reports failure:
/// everything a logger learns ends up as a log record or nowhere.
pub trait QueryLogger: Send + Sync {
    /// Return a logger configured for `level`.
    fn log_mode(&self, level: LogLevel) -> Box<dyn QueryLogger>;

    fn info(&self, args: fmt::Arguments<'_>);

    fn warn(&self, args: fmt::Arguments<'_>);

    fn error(&self, args: fmt::Arguments<'_>);

    /// Report a finished query that started at `begin`.
    ///
    /// `query` is called at most once, after the elapsed time has been taken.
    /// `err` is `None` when the query succeeded.
    fn trace(&self, begin: Instant, query: SqlThunk<'_>, err: Option<&DbErr>);
}
