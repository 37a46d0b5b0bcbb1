//! Diagnostics — where failures go.
//!
//! Nothing in the tile layer panics on bad input. A missing atlas, an unknown
//! sub-image name, or a draw before the first upload is *reported* to a
//! [`DiagnosticsSink`] and the offending operation becomes a no-op (or
//! returns an error the caller may ignore). The default sink forwards to the
//! `log` facade; tests swap in a [`MemorySink`] and assert on what was
//! reported.
//!
//! Process-wide logger setup lives here too: [`init_logging`] builds an
//! `env_logger` once, honoring `RUST_LOG` when no explicit filter is given.

use std::cell::RefCell;
use std::sync::Once;

/// How bad a reported condition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

impl Severity {
    fn level(self) -> log::Level {
        match self {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warn => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

/// Receiver for failures and state changes the caller should know about.
pub trait DiagnosticsSink {
    fn report(&self, severity: Severity, message: &str);
}

/// Forwards every report to the `log` facade under the `mosaik` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn report(&self, severity: Severity, message: &str) {
        log::log!(target: "mosaik", severity.level(), "{message}");
    }
}

/// Keeps reports in memory for later inspection. Also echoes them to `log`
/// at debug level so test output stays readable.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: RefCell<Vec<(Severity, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far, oldest first.
    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries.borrow().clone()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }

    /// True if some report of `severity` contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|(s, message)| *s == severity && message.contains(needle))
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl DiagnosticsSink for MemorySink {
    fn report(&self, severity: Severity, message: &str) {
        log::debug!(target: "mosaik", "[{severity:?}] {message}");
        self.entries.borrow_mut().push((severity, message.to_owned()));
    }
}

// ── Logger setup ─────────────────────────────────────────────────────────

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "mosaik=debug,wgpu=warn").
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored, as is an
/// already-installed logger from elsewhere in the process.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);

        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}
