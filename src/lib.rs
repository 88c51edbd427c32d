//! # sea-orm-tracelog
//!
//! A SeaORM query logger that reports through `tracing` and attributes every record
//! to the application code that issued the query.
//!
//! Queries run through a [`TracedConnection`] are handed to a [`QueryLogger`]
//! once they finish. The bundled [`TracingLogger`] turns each one into zero or
//! more `tracing` events. It walks the call stack past SeaORM's internals and
//! this crate's own frames, so a slow query points at your handler rather than
//! at the executor.
//!
//! ## Features
//!
//! - **Slow Query Log**: Queries above a threshold (200ms by default) are reported at WARN
//! - **Error Reporting**: Failed queries are reported at ERROR with the error detail
//! - **Expected Absence**: `DbErr::RecordNotFound` is a WARN, not a failure
//! - **Query Log**: Optionally report every query at DEBUG
//! - **Caller Attribution**: Records carry the application file and line in `caller`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sea_orm::Database;
//! use sea_orm_tracelog::prelude::*;
//!
//! tracing_subscriber::fmt::init();
//!
//! // Wrap your existing connection
//! let db = Database::connect("postgres://localhost/mydb").await?;
//! let traced_db = db.with_tracing()?;
//!
//! // Use it exactly like a normal DatabaseConnection
//! let users = Users::find().all(&traced_db).await?;
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use sea_orm_tracelog::{FrameFilter, LoggerConfig};
//!
//! let logger = LoggerConfig::default()
//!     .with_dispatch(dispatch)
//!     .with_query_logging(true)  // DEBUG record for every query
//!     .with_slow_query_threshold(Duration::from_millis(100))
//!     .with_frame_filter(FrameFilter::package("my-repo-layer"))
//!     .build()?;
//!
//! let traced_db = db.with_query_logger(logger);
//! ```
//!
//! ## Record Fields
//!
//! | Field | Description |
//! |-------|-------------|
//! | `sql` | Executed statement with bound values |
//! | `time` | Elapsed time, e.g. `"12.345ms"` |
//! | `rows` | Rows affected or returned, `-1` when unknown |
//! | `error` | Error detail (failed queries only) |
//! | `caller` | `file:line` of the application frame, when resolved |
//!
//! Resolving `caller` reads the binary's line tables, so it needs debug info. The
//! default `release` profile has none, and records there carry no `caller` field.
//! Set `debug = "line-tables-only"` (or higher) under `[profile.release]` to keep it.

mod config;
mod connection;
mod error;
mod filter;
mod handle;
mod logger;
mod resolver;
mod tracer;

#[cfg(test)]
mod testing;

pub use config::{LoggerConfig, DEFAULT_MAX_DEPTH, DEFAULT_MIN_DEPTH, DEFAULT_SLOW_THRESHOLD};
pub use connection::{QueryLogExt, TracedConnection};
pub use error::ConfigError;
pub use filter::{default_filters, FrameFilter};
pub use handle::{format_elapsed, LogHandle, QueryFields, TARGET};
pub use logger::{LogLevel, QueryLogger, SqlThunk};
pub use resolver::{CallSite, FrameResolver, StackFrame, StackFrames};
pub use tracer::TracingLogger;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{LoggerConfig, QueryLogExt, QueryLogger, TracedConnection, TracingLogger};
}
