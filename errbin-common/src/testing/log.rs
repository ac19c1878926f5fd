//! Tracing setup for tests.
//!
//! Tests that want to see registration and dispatch events call
//! [`init_global_test_logging`], usually from a `#[ctor::ctor]` hook:
//!
//! ```ignore
//! #[ctor::ctor]
//! fn setup() {
//!     errbin_common::testing::init_global_test_logging();
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Mutex, Once};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Crates whose events are captured.
const TARGETS: [&str; 3] = ["errbin_common", "errbin_http", "errbind"];

const DEFAULT_LEVEL: &str = "debug";

static GLOBAL_LOGGING_INIT: Once = Once::new();

/// Install a global subscriber writing JSONL events plus compact test output.
///
/// Each package gets its own file, `target/test-logs/<package>_tests.jsonl`,
/// so parallel test binaries of different crates do not clobber each other.
/// Only the first call installs anything.
///
/// # Environment Variables
///
/// - `ERRBIN_TEST_LOG_FILE`: JSONL output path override
/// - `ERRBIN_TEST_LOG_LEVEL`: level for the errbin crates (default: `debug`)
pub fn init_global_test_logging() {
    GLOBAL_LOGGING_INIT.call_once(|| {
        let level = std::env::var("ERRBIN_TEST_LOG_LEVEL").ok();
        let filter = test_filter(level.as_deref());

        let file_layer = open_log_file().map(|file| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(Mutex::new(file))
                .with_current_span(true)
                .with_file(true)
                .with_line_number(true)
        });
        let test_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .compact();

        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(test_layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// `target=level` for every errbin crate.
fn filter_directives(level: &str) -> String {
    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Filter for the errbin crates; an unparsable level falls back to the default.
fn test_filter(level: Option<&str>) -> EnvFilter {
    let level = level.unwrap_or(DEFAULT_LEVEL);
    EnvFilter::try_new(filter_directives(level))
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(DEFAULT_LEVEL)))
}

fn open_log_file() -> Option<std::fs::File> {
    let path = match std::env::var_os("ERRBIN_TEST_LOG_FILE") {
        Some(custom) => PathBuf::from(custom),
        None => target_dir()
            .join("test-logs")
            .join(log_file_name(std::env::var("CARGO_PKG_NAME").ok().as_deref())),
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    std::fs::File::create(path).ok()
}

fn log_file_name(package: Option<&str>) -> String {
    format!("{}_tests.jsonl", package.unwrap_or("errbin").replace('-', "_"))
}

/// `CARGO_TARGET_DIR`, else the first `target/` above the package directory.
fn target_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("CARGO_TARGET_DIR") {
        return PathBuf::from(dir);
    }
    let start = std::env::var_os("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default();
    find_target_above(&start).unwrap_or_else(|| PathBuf::from("target"))
}

fn find_target_above(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join("target"))
        .find(|target| target.is_dir())
}
