//! Call-site resolution.
//!
//! `tracing` stamps every event with the file and line of the macro that produced
//! it, which for query logging is always inside this crate. The resolver walks the
//! live stack instead and picks the first frame that belongs to neither SeaORM nor
//! this crate, so a slow or failing query points at the application code that ran it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{DEFAULT_MAX_DEPTH, DEFAULT_MIN_DEPTH};
use crate::filter::{default_filters, FrameFilter};

/// Frames collected above the marker before giving up on finding it.
const PREAMBLE_LIMIT: usize = 32;

/// One logical stack frame. Inlined calls get a frame each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackFrame {
    file: Option<PathBuf>,
    line: Option<u32>,
}

impl StackFrame {
    pub fn new(file: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            file: Some(file.into()),
            line: Some(line),
        }
    }

    /// A frame whose symbols could not be resolved.
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }
}

/// A snapshot of the call stack, innermost frame first.
#[derive(Debug, Clone, Default)]
pub struct StackFrames {
    frames: Vec<StackFrame>,
}

impl StackFrames {
    /// Capture up to `limit` frames of the current stack.
    ///
    /// Depth 0 is the function that called `capture`; the frames of `capture`
    /// itself and of the unwinder are dropped.
    #[inline(never)]
    pub fn capture(limit: usize) -> Self {
        let marker = StackFrames::capture as fn(usize) -> StackFrames as usize;
        let mut frames = Vec::new();
        let mut start = None;

        backtrace::trace(|frame| {
            let is_marker = frame.symbol_address() as usize == marker;
            let before = frames.len();
            backtrace::resolve_frame(frame, |symbol| {
                frames.push(StackFrame {
                    file: symbol.filename().map(Path::to_path_buf),
                    line: symbol.lineno(),
                });
            });
            if frames.len() == before {
                frames.push(StackFrame::unresolved());
            }
            if is_marker && start.is_none() {
                start = Some(frames.len());
            }

            match start {
                Some(start) => frames.len() - start < limit,
                None => frames.len() < limit + PREAMBLE_LIMIT,
            }
        });

        // Without the marker the depths are off by the unwinder's own frames;
        // the filters still keep those out of the result.
        if let Some(start) = start {
            frames = frames.split_off(start);
        }
        frames.truncate(limit);
        Self { frames }
    }

    pub fn get(&self, depth: usize) -> Option<&StackFrame> {
        self.frames.get(depth)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl From<Vec<StackFrame>> for StackFrames {
    fn from(frames: Vec<StackFrame>) -> Self {
        Self { frames }
    }
}

/// The frame a log record is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    depth: usize,
    file: PathBuf,
    line: Option<u32>,
}

impl CallSite {
    /// Stack depth of the frame, counted from the resolver.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file.display(), line),
            None => write!(f, "{}", self.file.display()),
        }
    }
}

/// Finds the first stack frame outside the excluded paths.
///
/// Scans depths `min_depth..max_depth`. The default window of `2..15` skips the
/// resolver and its immediate caller and gives up after 13 candidates.
#[derive(Debug, Clone)]
pub struct FrameResolver {
    filters: Arc<[FrameFilter]>,
    min_depth: usize,
    max_depth: usize,
}

impl Default for FrameResolver {
    fn default() -> Self {
        Self::new(default_filters(), DEFAULT_MIN_DEPTH, DEFAULT_MAX_DEPTH)
    }
}

impl FrameResolver {
    pub fn new(filters: Vec<FrameFilter>, min_depth: usize, max_depth: usize) -> Self {
        Self {
            filters: filters.into(),
            min_depth,
            max_depth,
        }
    }

    pub fn filters(&self) -> &[FrameFilter] {
        &self.filters
    }

    /// Resolve the caller from the live stack.
    ///
    /// `None` means no frame in the window qualified; the record is then emitted
    /// without a resolved call site.
    #[inline(never)]
    pub fn resolve(&self) -> Option<CallSite> {
        let stack = StackFrames::capture(self.max_depth);
        self.resolve_in(&stack)
    }

    /// Resolve the caller from an already captured stack.
    pub fn resolve_in(&self, stack: &StackFrames) -> Option<CallSite> {
        (self.min_depth..self.max_depth).find_map(|depth| {
            let frame = stack.get(depth)?;
            let file = frame.file()?;
            if self.is_excluded(file) {
                return None;
            }
            Some(CallSite {
                depth,
                file: file.to_path_buf(),
                line: frame.line(),
            })
        })
    }

    fn is_excluded(&self, file: &Path) -> bool {
        self.filters.iter().any(|filter| filter.matches(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = "/home/dev/.cargo/registry/src/index.crates.io-6f17d22bba15001f";

    fn own(file: &str, line: u32) -> StackFrame {
        StackFrame::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("src").join(file), line)
    }

    fn orm(file: &str, line: u32) -> StackFrame {
        StackFrame::new(format!("{REGISTRY}/sea-orm-1.1.4/src/{file}"), line)
    }

    #[test]
    fn test_resolves_first_application_frame() {
        let stack = StackFrames::from(vec![
            own("resolver.rs", 180),
            own("tracer.rs", 120),
            StackFrame::new("/work/app/src/handlers/users.rs", 42),
            StackFrame::new("/work/app/src/main.rs", 10),
        ]);

        let site = FrameResolver::default().resolve_in(&stack).unwrap();
        assert_eq!(site.depth(), 2);
        assert_eq!(site.file(), Path::new("/work/app/src/handlers/users.rs"));
        assert_eq!(site.line(), Some(42));
        assert_eq!(site.to_string(), "/work/app/src/handlers/users.rs:42");
    }

    #[test]
    fn test_skips_orm_and_adapter_frames() {
        let stack = StackFrames::from(vec![
            own("resolver.rs", 180),
            own("tracer.rs", 120),
            own("connection.rs", 150),
            orm("executor/select.rs", 900),
            StackFrame::unresolved(),
            StackFrame::new(
                "/rustc/90b35a6239c3d8bdabc530a6a0816f7ff89a0aaf/library/core/src/future/future.rs",
                123,
            ),
            StackFrame::new("/work/app/tests/users.rs", 7),
            StackFrame::new("/work/app/src/repo.rs", 88),
        ]);

        let site = FrameResolver::default().resolve_in(&stack).unwrap();
        assert_eq!(site.depth(), 7);
        assert_eq!(site.file(), Path::new("/work/app/src/repo.rs"));
    }

    #[test]
    fn test_starts_scanning_at_min_depth() {
        let stack = StackFrames::from(vec![
            StackFrame::new("/work/app/src/a.rs", 1),
            StackFrame::new("/work/app/src/b.rs", 2),
            StackFrame::new("/work/app/src/c.rs", 3),
        ]);

        let site = FrameResolver::default().resolve_in(&stack).unwrap();
        assert_eq!(site.depth(), 2);
        assert_eq!(site.file(), Path::new("/work/app/src/c.rs"));
    }

    #[test]
    fn test_falls_back_when_window_is_all_orm() {
        let frames = (0..40).map(|i| orm("executor/query.rs", i)).collect::<Vec<_>>();
        let stack = StackFrames::from(frames);
        assert_eq!(FrameResolver::default().resolve_in(&stack), None);
    }

    #[test]
    fn test_ignores_frames_past_max_depth() {
        let mut frames = (0..DEFAULT_MAX_DEPTH)
            .map(|i| orm("executor/query.rs", i as u32))
            .collect::<Vec<_>>();
        frames.push(StackFrame::new("/work/app/src/main.rs", 3));

        let stack = StackFrames::from(frames);
        assert_eq!(FrameResolver::default().resolve_in(&stack), None);
    }

    #[test]
    fn test_falls_back_on_short_stack() {
        let stack = StackFrames::from(vec![own("resolver.rs", 1)]);
        assert_eq!(FrameResolver::default().resolve_in(&stack), None);
        assert_eq!(FrameResolver::default().resolve_in(&StackFrames::default()), None);
    }

    #[test]
    fn test_custom_filters_replace_defaults() {
        let stack = StackFrames::from(vec![
            StackFrame::unresolved(),
            StackFrame::new("/work/app/src/db/pool.rs", 5),
            StackFrame::new("/work/app/src/handlers.rs", 9),
        ]);
        let resolver = FrameResolver::new(
            vec![FrameFilter::path_prefix("/work/app/src/db")],
            0,
            DEFAULT_MAX_DEPTH,
        );

        let site = resolver.resolve_in(&stack).unwrap();
        assert_eq!(site.depth(), 2);
        assert_eq!(site.file(), Path::new("/work/app/src/handlers.rs"));
    }

    #[test]
    fn test_capture_respects_limit() {
        let stack = StackFrames::capture(4);
        assert!(stack.len() <= 4);
    }

    #[test]
    fn test_live_resolve_falls_back_inside_own_tests() {
        // every frame here is this crate, the test harness or std
        assert_eq!(FrameResolver::default().resolve(), None);
    }

    #[test]
    #[cfg_attr(not(debug_assertions), ignore)]
    fn test_live_capture_starts_at_caller() {
        let resolver = FrameResolver::new(
            vec![FrameFilter::package("backtrace"), FrameFilter::RustStd],
            0,
            64,
        );

        let site = resolver.resolve().unwrap();
        assert_eq!(site.depth(), 0);
        assert!(site.file().ends_with("src/resolver.rs"));
    }
}
