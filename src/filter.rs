//! Path-based rules deciding which stack frames can never be the caller.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;

/// A rule excluding stack frames from call-site resolution, matched against the
/// frame's source file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameFilter {
    /// Sources of a cargo package: a path component equal to the name, or the name
    /// followed by `-<version>` (registry) or `-<hash>` (git checkout).
    Package(Cow<'static, str>),
    /// Any file below this directory.
    PathPrefix(PathBuf),
    /// Test sources: files in a crate's `tests/` directory, or named `tests.rs`,
    /// `*_test.rs` or `*_tests.rs`. A `tests` directory further up, above a
    /// checkout's `src/`, does not count.
    TestFiles,
    /// The Rust standard library (`/rustc/<hash>/library/...` or a `rustlib` tree).
    RustStd,
}

/// Packages whose frames sit between application code and the logger.
const ORM_PACKAGES: &[&str] = &[
    "sea-orm",
    "sea-orm-macros",
    "sea-query",
    "sea-query-binder",
    "sqlx",
    "sqlx-core",
    "sqlx-postgres",
    "sqlx-mysql",
    "sqlx-sqlite",
];

static DEFAULT_FILTERS: Lazy<Vec<FrameFilter>> = Lazy::new(|| {
    let mut filters: Vec<FrameFilter> = ORM_PACKAGES
        .iter()
        .map(|name| FrameFilter::package(*name))
        .collect();
    filters.push(FrameFilter::package("backtrace"));
    filters.push(FrameFilter::path_prefix(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("src"),
    ));
    filters.push(FrameFilter::RustStd);
    filters.push(FrameFilter::TestFiles);
    filters
});

/// The exclusion list used unless a configuration overrides it.
///
/// Covers SeaORM and the sqlx drivers beneath it, this crate's own sources, the
/// standard library and test files.
pub fn default_filters() -> Vec<FrameFilter> {
    DEFAULT_FILTERS.clone()
}

impl FrameFilter {
    pub fn package(name: impl Into<Cow<'static, str>>) -> Self {
        FrameFilter::Package(name.into())
    }

    pub fn path_prefix(prefix: impl Into<PathBuf>) -> Self {
        FrameFilter::PathPrefix(prefix.into())
    }

    /// Returns `true` if a frame in `file` must be skipped.
    pub fn matches(&self, file: &Path) -> bool {
        match self {
            FrameFilter::Package(name) => normal_components(file).any(|c| is_package_dir(c, name)),
            FrameFilter::PathPrefix(prefix) => file.starts_with(prefix),
            FrameFilter::TestFiles => is_test_file(file),
            FrameFilter::RustStd => is_rust_std(file),
        }
    }
}

fn normal_components(path: &Path) -> impl Iterator<Item = &str> {
    path.components().filter_map(|c| match c {
        Component::Normal(part) => part.to_str(),
        _ => None,
    })
}

fn is_package_dir(component: &str, name: &str) -> bool {
    if component == name {
        return true;
    }
    let Some(suffix) = component
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return false;
    };
    // `sea-orm-1.1.4` or `sea-orm-3f1c0a9e2b7d5c41`, but never `sea-orm-macros`
    let is_version = suffix.starts_with(|c: char| c.is_ascii_digit());
    let is_hash = suffix.len() >= 7 && suffix.chars().all(|c| c.is_ascii_hexdigit());
    is_version || is_hash
}

fn is_test_file(path: &Path) -> bool {
    // only a crate's own `tests/` dir: no `src` may follow it
    let in_tests_dir = path.parent().is_some_and(|dir| {
        let dirs: Vec<&str> = normal_components(dir).collect();
        dirs.iter()
            .rposition(|c| *c == "tests")
            .is_some_and(|at| !dirs[at + 1..].contains(&"src"))
    });
    let test_stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .is_some_and(|stem| stem == "tests" || stem.ends_with("_test") || stem.ends_with("_tests"));
    in_tests_dir || test_stem
}

fn is_rust_std(path: &Path) -> bool {
    let mut components = normal_components(path);
    if path.has_root() && components.next() == Some("rustc") {
        return true;
    }
    normal_components(path).any(|c| c == "rustlib")
}
