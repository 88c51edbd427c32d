//! Errors raised while configuring a query logger.

use thiserror::Error;

/// A query logger could not be built from the supplied configuration.
///
/// These surface at construction time. Once a [`TracingLogger`](crate::TracingLogger)
/// exists, none of its operations fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No `tracing::Dispatch` was supplied.
    #[error("a tracing dispatch is required to build a query logger")]
    MissingDispatch,

    /// The dispatch discards everything (`NoSubscriber`), so no record could ever be written.
    #[error("the tracing dispatch has no subscriber installed")]
    NoSubscriber,

    /// The frame scan window is empty.
    #[error("invalid frame depth range {min}..{max}: min must be below max")]
    InvalidDepthRange { min: usize, max: usize },
}
