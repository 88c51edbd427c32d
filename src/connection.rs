//! Database connection wrapper that reports every query to a [`QueryLogger`].

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    ExecResult, IsolationLevel, QueryResult, Statement, StreamTrait, TransactionError,
    TransactionTrait,
};

use crate::error::ConfigError;
use crate::logger::QueryLogger;
use crate::tracer::TracingLogger;

/// Row count reported when an operation cannot provide one.
const ROWS_UNAVAILABLE: i64 = -1;

fn saturating_rows(rows: u64) -> i64 {
    i64::try_from(rows).unwrap_or(i64::MAX)
}

/// A logging wrapper around SeaORM's `DatabaseConnection`.
///
/// This wrapper implements `ConnectionTrait`, `StreamTrait`, and `TransactionTrait`,
/// making it a drop-in replacement for `DatabaseConnection`. Once an operation
/// finishes, its start time, statement and result are handed to the logger; the
/// result itself is returned to the caller unchanged.
///
/// Statements are only rendered to SQL text if the logger asks for them.
///
/// # Example
///
/// ```rust,ignore
/// use sea_orm::Database;
/// use sea_orm_tracelog::{TracedConnection, TracingLogger};
///
/// let db = Database::connect("postgres://localhost/mydb").await?;
/// let traced = TracedConnection::new(db, TracingLogger::from_default(false)?);
///
/// // Slow and failing queries are now logged
/// let users = Users::find().all(&traced).await?;
/// ```
/// Cloning shares both the connection and the logger.
#[derive(Clone)]
pub struct TracedConnection {
    inner: Arc<DatabaseConnection>,
    logger: Arc<dyn QueryLogger>,
}

impl TracedConnection {
    /// Create a new traced connection reporting to `logger`.
    pub fn new(connection: DatabaseConnection, logger: impl QueryLogger + 'static) -> Self {
        Self {
            inner: Arc::new(connection),
            logger: Arc::new(logger),
        }
    }

    /// Create a traced connection with a shared logger.
    pub fn with_shared_logger(connection: DatabaseConnection, logger: Arc<dyn QueryLogger>) -> Self {
        Self {
            inner: Arc::new(connection),
            logger,
        }
    }

    /// Create a traced connection that reports to the current default `tracing`
    /// subscriber, logging only slow and failed queries.
    pub fn wrap(connection: DatabaseConnection) -> Result<Self, ConfigError> {
        Ok(Self::new(connection, TracingLogger::from_default(false)?))
    }

    /// Get a reference to the underlying `DatabaseConnection`.
    pub fn inner(&self) -> &DatabaseConnection {
        self.inner.as_ref()
    }

    pub fn logger(&self) -> &dyn QueryLogger {
        self.logger.as_ref()
    }

    /// Consume the wrapper and return the inner `DatabaseConnection`.
    ///
    /// Fails, handing the wrapper back, while clones of it are still alive.
    pub fn into_inner(self) -> Result<DatabaseConnection, Self> {
        let logger = self.logger;
        Arc::try_unwrap(self.inner).map_err(|inner| Self { inner, logger })
    }

    /// Report a finished operation to the logger.
    fn observe<T>(
        &self,
        start: Instant,
        stmt: &Statement,
        result: &Result<T, DbErr>,
        row_count: impl FnOnce(&T) -> i64,
    ) {
        let query = Box::new(move || {
            let rows = result.as_ref().map_or(ROWS_UNAVAILABLE, row_count);
            (stmt.to_string(), rows)
        });
        self.logger.trace(start, query, result.as_ref().err());
    }

    /// Report a whole transaction. Only connection-level failures count as query
    /// errors; an error returned by the callback belongs to the application.
    fn observe_transaction<T, E>(&self, start: Instant, result: &Result<T, TransactionError<E>>) {
        let err = match result {
            Err(TransactionError::Connection(err)) => Some(err),
            _ => None,
        };
        let query = Box::new(|| ("TRANSACTION".to_string(), ROWS_UNAVAILABLE));
        self.logger.trace(start, query, err);
    }

    fn begin_statement(&self) -> Statement {
        Statement::from_string(self.get_database_backend(), "BEGIN")
    }
}

impl fmt::Debug for TracedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracedConnection")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl AsRef<DatabaseConnection> for TracedConnection {
    fn as_ref(&self) -> &DatabaseConnection {
        self.inner.as_ref()
    }
}

#[async_trait]
impl ConnectionTrait for TracedConnection {
    fn get_database_backend(&self) -> DbBackend {
        self.inner.get_database_backend()
    }

    async fn execute(&self, stmt: Statement) -> Result<ExecResult, DbErr> {
        let logged = stmt.clone();
        let start = Instant::now();

        let result = self.inner.execute(stmt).await;

        self.observe(start, &logged, &result, |r| saturating_rows(r.rows_affected()));
        result
    }

    async fn execute_unprepared(&self, sql: &str) -> Result<ExecResult, DbErr> {
        let logged = Statement::from_string(self.get_database_backend(), sql);
        let start = Instant::now();

        let result = self.inner.execute_unprepared(sql).await;

        self.observe(start, &logged, &result, |r| saturating_rows(r.rows_affected()));
        result
    }

    async fn query_one(&self, stmt: Statement) -> Result<Option<QueryResult>, DbErr> {
        let logged = stmt.clone();
        let start = Instant::now();

        let result = self.inner.query_one(stmt).await;

        self.observe(start, &logged, &result, |row| i64::from(row.is_some()));
        result
    }

    async fn query_all(&self, stmt: Statement) -> Result<Vec<QueryResult>, DbErr> {
        let logged = stmt.clone();
        let start = Instant::now();

        let result = self.inner.query_all(stmt).await;

        self.observe(start, &logged, &result, |rows| {
            saturating_rows(u64::try_from(rows.len()).unwrap_or(u64::MAX))
        });
        result
    }

    fn support_returning(&self) -> bool {
        self.inner.support_returning()
    }

    fn is_mock_connection(&self) -> bool {
        self.inner.is_mock_connection()
    }
}

#[async_trait]
impl StreamTrait for TracedConnection {
    type Stream<'a> = <DatabaseConnection as StreamTrait>::Stream<'a>;

    fn stream<'a>(
        &'a self,
        stmt: Statement,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Stream<'a>, DbErr>> + 'a + Send>> {
        let logged = stmt.clone();
        let start = Instant::now();

        Box::pin(async move {
            let result = self.inner.as_ref().stream(stmt).await;

            // Rows arrive after the stream is handed out, so there is no count yet
            self.observe(start, &logged, &result, |_| ROWS_UNAVAILABLE);
            result
        })
    }
}

#[async_trait]
impl TransactionTrait for TracedConnection {
    async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        let start = Instant::now();

        let result = self.inner.begin().await;

        self.observe(start, &self.begin_statement(), &result, |_| ROWS_UNAVAILABLE);
        result
    }

    async fn begin_with_config(
        &self,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<DatabaseTransaction, DbErr> {
        let start = Instant::now();

        let result = self
            .inner
            .begin_with_config(isolation_level, access_mode)
            .await;

        self.observe(start, &self.begin_statement(), &result, |_| ROWS_UNAVAILABLE);
        result
    }

    async fn transaction<F, T, E>(&self, callback: F) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        let start = Instant::now();

        let result = self.inner.transaction(callback).await;

        self.observe_transaction(start, &result);
        result
    }

    async fn transaction_with_config<F, T, E>(
        &self,
        callback: F,
        isolation_level: Option<IsolationLevel>,
        access_mode: Option<AccessMode>,
    ) -> Result<T, TransactionError<E>>
    where
        F: for<'c> FnOnce(
                &'c DatabaseTransaction,
            ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>
            + Send,
        T: Send,
        E: std::fmt::Display + std::fmt::Debug + Send,
    {
        let start = Instant::now();

        let result = self
            .inner
            .transaction_with_config(callback, isolation_level, access_mode)
            .await;

        self.observe_transaction(start, &result);
        result
    }
}

/// Extension trait for easy wrapping of database connections.
pub trait QueryLogExt {
    /// Wrap this connection, reporting to the current default `tracing` subscriber.
    fn with_tracing(self) -> Result<TracedConnection, ConfigError>;

    /// Wrap this connection with a custom logger.
    fn with_query_logger<L: QueryLogger + 'static>(self, logger: L) -> TracedConnection;
}

impl QueryLogExt for DatabaseConnection {
    fn with_tracing(self) -> Result<TracedConnection, ConfigError> {
        TracedConnection::wrap(self)
    }

    fn with_query_logger<L: QueryLogger + 'static>(self, logger: L) -> TracedConnection {
        TracedConnection::new(self, logger)
    }
}
