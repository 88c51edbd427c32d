//! Configuration for query logging.

use std::time::Duration;

use tracing::Dispatch;

use crate::error::ConfigError;
use crate::filter::{default_filters, FrameFilter};
use crate::resolver::FrameResolver;
use crate::tracer::TracingLogger;

/// Queries slower than this are reported unless configured otherwise.
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_millis(200);

/// First stack depth considered by call-site resolution.
pub const DEFAULT_MIN_DEPTH: usize = 2;

/// Stack depth (exclusive) at which call-site resolution gives up.
pub const DEFAULT_MAX_DEPTH: usize = 15;

/// Configuration options for a [`TracingLogger`].
///
/// # Example
///
/// ```rust
/// use sea_orm_tracelog::LoggerConfig;
/// use std::time::Duration;
///
/// let config = LoggerConfig::default()
///     .with_query_logging(true)
///     .with_slow_query_threshold(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Where records are sent. Required by [`build`](Self::build).
    /// Default: `None`
    pub dispatch: Option<Dispatch>,

    /// Queries taking longer than this are logged at WARN level.
    /// A zero duration disables slow-query reporting.
    /// Default: 200ms
    pub slow_query_threshold: Duration,

    /// Log every query at DEBUG level, not only slow or failed ones.
    /// Default: `false`
    pub log_queries: bool,

    /// Frames matching any of these are never reported as the caller.
    /// Default: [`default_filters`]
    pub frame_filters: Vec<FrameFilter>,

    /// First stack depth considered when resolving the caller.
    /// Default: 2
    pub min_depth: usize,

    /// Stack depth (exclusive) at which resolution falls back.
    /// Default: 15
    pub max_depth: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            dispatch: None,
            slow_query_threshold: DEFAULT_SLOW_THRESHOLD,
            log_queries: false,
            frame_filters: default_filters(),
            min_depth: DEFAULT_MIN_DEPTH,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl LoggerConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dispatch records are written to.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    /// Set the threshold for slow query warnings.
    pub fn with_slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    /// Enable or disable DEBUG records for every query.
    ///
    /// **Security Warning**: records carry the rendered SQL including bound values.
    pub fn with_query_logging(mut self, enabled: bool) -> Self {
        self.log_queries = enabled;
        self
    }

    /// Exclude one more kind of frame from call-site resolution.
    ///
    /// Use this for in-house layers between your handlers and SeaORM, such as a
    /// repository crate.
    pub fn with_frame_filter(mut self, filter: FrameFilter) -> Self {
        self.frame_filters.push(filter);
        self
    }

    /// Replace the whole exclusion list.
    pub fn with_frame_filters(mut self, filters: Vec<FrameFilter>) -> Self {
        self.frame_filters = filters;
        self
    }

    /// Set the window of stack depths scanned for the caller.
    pub fn with_depth_range(mut self, min_depth: usize, max_depth: usize) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    /// Create a development-friendly configuration that logs every query.
    ///
    /// **Warning**: Do not use in production as it logs all SQL with bound values.
    pub fn development() -> Self {
        Self {
            slow_query_threshold: Duration::from_millis(100),
            log_queries: true,
            ..Self::default()
        }
    }

    /// Create a production configuration that only reports slow and failed queries.
    pub fn production() -> Self {
        Self {
            slow_query_threshold: Duration::from_secs(1),
            log_queries: false,
            ..Self::default()
        }
    }

    /// Validate the configuration and build the logger.
    pub fn build(self) -> Result<TracingLogger, ConfigError> {
        let dispatch = self.dispatch.ok_or(ConfigError::MissingDispatch)?;
        if self.min_depth >= self.max_depth {
            return Err(ConfigError::InvalidDepthRange {
                min: self.min_depth,
                max: self.max_depth,
            });
        }
        let resolver = FrameResolver::new(self.frame_filters, self.min_depth, self.max_depth);
        TracingLogger::from_parts(dispatch, self.slow_query_threshold, self.log_queries, resolver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Capture;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::default();
        assert!(config.dispatch.is_none());
        assert_eq!(config.slow_query_threshold, Duration::from_millis(200));
        assert!(!config.log_queries);
        assert_eq!(config.frame_filters, default_filters());
        assert_eq!((config.min_depth, config.max_depth), (2, 15));
    }

    #[test]
    fn test_builder() {
        let config = LoggerConfig::default()
            .with_query_logging(true)
            .with_slow_query_threshold(Duration::ZERO)
            .with_frame_filter(FrameFilter::package("app-repo"));

        assert!(config.log_queries);
        assert!(config.slow_query_threshold.is_zero());
        assert_eq!(config.frame_filters.last(), Some(&FrameFilter::package("app-repo")));
    }

    #[test]
    fn test_development_config() {
        let config = LoggerConfig::development();
        assert!(config.log_queries);
        assert_eq!(config.slow_query_threshold, Duration::from_millis(100));
    }

    #[test]
    fn test_production_config() {
        let config = LoggerConfig::production();
        assert!(!config.log_queries);
        assert_eq!(config.slow_query_threshold, Duration::from_secs(1));
    }

    #[test]
    fn test_build_requires_dispatch() {
        let err = LoggerConfig::default().build().unwrap_err();
        assert_eq!(err, ConfigError::MissingDispatch);
    }

    #[test]
    fn test_build_rejects_noop_dispatch() {
        let err = LoggerConfig::default()
            .with_dispatch(Dispatch::none())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::NoSubscriber);
    }

    #[test]
    fn test_build_rejects_empty_depth_range() {
        let err = LoggerConfig::default()
            .with_dispatch(Capture::new().dispatch())
            .with_depth_range(5, 5)
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidDepthRange { min: 5, max: 5 });
    }

    #[test]
    fn test_build_carries_settings() {
        let logger = LoggerConfig::development()
            .with_dispatch(Capture::new().dispatch())
            .build()
            .unwrap();
        assert!(logger.log_queries);
        assert_eq!(logger.slow_threshold, Duration::from_millis(100));
    }
}
