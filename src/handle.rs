//! Logging handles bound to a resolved call site.

use std::fmt;
use std::time::Duration;

use sea_orm::DbErr;
use tracing::{Dispatch, Level};

use crate::resolver::CallSite;

/// Target of every event this crate emits.
pub const TARGET: &str = "sea_orm_tracelog";

/// Fields shared by all records emitted for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFields {
    pub sql: String,
    /// Elapsed time as `"<millis>.<3 decimals>ms"`.
    pub time: String,
    pub rows: i64,
}

impl QueryFields {
    pub fn new(sql: String, elapsed: Duration, rows: i64) -> Self {
        Self {
            sql,
            time: format_elapsed(elapsed),
            rows,
        }
    }
}

/// Format a duration in milliseconds with three decimals, e.g. `"50.000ms"`.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}ms", elapsed.as_nanos() as f64 / 1_000_000.0)
}

macro_rules! query_event {
    ($handle:expr, $level:expr, $fields:expr, $message:literal $(, $key:ident = $value:expr)*) => {{
        let handle = $handle;
        let fields = $fields;
        let caller = handle.call_site.as_ref().map(tracing::field::display);
        tracing::dispatcher::with_default(handle.dispatch, || {
            tracing::event!(
                target: TARGET,
                $level,
                sql = fields.sql.as_str(),
                time = fields.time.as_str(),
                rows = fields.rows,
                $($key = $value,)*
                caller,
                $message
            )
        })
    }};
}

macro_rules! message_event {
    ($handle:expr, $level:expr, $args:expr) => {{
        let handle = $handle;
        let caller = handle.call_site.as_ref().map(tracing::field::display);
        tracing::dispatcher::with_default(handle.dispatch, || {
            tracing::event!(target: TARGET, $level, caller, "{}", $args)
        })
    }};
}

/// A dispatch plus the call site its records are attributed to.
///
/// Without a call site, records fall back to the static location `tracing`
/// gives every event.
#[derive(Debug, Clone)]
pub struct LogHandle<'a> {
    dispatch: &'a Dispatch,
    call_site: Option<CallSite>,
}

impl<'a> LogHandle<'a> {
    pub fn new(dispatch: &'a Dispatch, call_site: Option<CallSite>) -> Self {
        Self {
            dispatch,
            call_site,
        }
    }

    pub fn call_site(&self) -> Option<&CallSite> {
        self.call_site.as_ref()
    }

    /// The query matched no rows. Expected, so reported without the error.
    pub fn record_not_found(&self, fields: &QueryFields) {
        query_event!(self, Level::WARN, fields, "record not found")
    }

    pub fn query_failed(&self, fields: &QueryFields, err: &DbErr) {
        query_event!(
            self,
            Level::ERROR,
            fields,
            "query failed",
            error = tracing::field::display(err)
        )
    }

    pub fn slow_query(&self, fields: &QueryFields) {
        query_event!(self, Level::WARN, fields, "slow query")
    }

    pub fn query(&self, fields: &QueryFields) {
        query_event!(self, Level::DEBUG, fields, "query")
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        message_event!(self, Level::DEBUG, args)
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        message_event!(self, Level::WARN, args)
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        message_event!(self, Level::ERROR, args)
    }
}
