//! Logging setup for djx
//!
//! All crate events use the `djx` target: registration, scope and injector
//! creation, and lookup failures at `DEBUG`; the resolution path at `TRACE`.
//!
//! # Features
//!
//! - `logging` - Emit events (default)
//! - `logging-json` - JSON structured output (production)
//! - `logging-pretty` - Pretty multi-line output (development)
//!
//! Without either subscriber feature every `init` function is a no-op and
//! events go to whatever subscriber the application installs.
//!
//! # Example
//!
//! ```rust,ignore
//! use djx::logging::{self, LogFormat};
//!
//! // JSON if logging-json, pretty if only logging-pretty
//! logging::init();
//!
//! logging::builder()
//!     .with_level(tracing::Level::TRACE)
//!     .with_format(LogFormat::Compact)
//!     .with_source_location()
//!     .djx_only()
//!     .init();
//! ```

#[cfg(feature = "logging")]
use tracing::Level;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging (production default)
    #[default]
    Json,
    /// Pretty multi-line output
    Pretty,
    /// Compact single-line output
    Compact,
}

/// Target used by every event this crate emits.
pub const TARGET: &str = "djx";

/// Builder for the tracing subscriber
#[cfg(feature = "logging")]
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    /// File and line of each event
    source_location: bool,
    /// Id and name of the emitting thread
    thread_info: bool,
}

#[cfg(feature = "logging")]
impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::default(),
            target: None,
            source_location: false,
            thread_info: false,
        }
    }
}

#[cfg(feature = "logging")]
impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Only show events from `target`
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    pub fn djx_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    pub fn with_source_location(mut self) -> Self {
        self.source_location = true;
        self
    }

    pub fn with_thread_info(mut self) -> Self {
        self.thread_info = true;
        self
    }

    /// Filter directive for the configured level and target.
    pub fn directive(&self) -> String {
        match self.target {
            Some(target) => format!("{}={}", target, self.level),
            None => self.level.to_string(),
        }
    }

    /// Install the subscriber globally.
    ///
    /// JSON output needs the `logging-json` feature; without it `Json`
    /// falls back to the default text format.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

        let layer = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => self.decorate(fmt::layer().json()).boxed(),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => self.decorate(fmt::layer()).boxed(),
            LogFormat::Pretty => self.decorate(fmt::layer().pretty()).boxed(),
            LogFormat::Compact => self.decorate(fmt::layer().compact()).boxed(),
        };

        tracing_subscriber::registry()
            .with(EnvFilter::new(self.directive()))
            .with(layer)
            .init();
    }

    /// Apply the event decorations shared by every format.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    fn decorate<S, N, L, T, W>(
        &self,
        layer: tracing_subscriber::fmt::Layer<S, N, tracing_subscriber::fmt::format::Format<L, T>, W>,
    ) -> tracing_subscriber::fmt::Layer<S, N, tracing_subscriber::fmt::format::Format<L, T>, W>
    where
        N: for<'writer> tracing_subscriber::fmt::FormatFields<'writer> + 'static,
    {
        layer
            .with_target(true)
            .with_file(self.source_location)
            .with_line_number(self.source_location)
            .with_thread_ids(self.thread_info)
            .with_thread_names(self.thread_info)
    }

    /// No-op without a subscriber feature
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

#[cfg(feature = "logging")]
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// `DEBUG` logging: JSON when `logging-json` is enabled, otherwise pretty.
#[cfg(feature = "logging")]
pub fn init() {
    let format = if cfg!(feature = "logging-json") {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    builder().with_format(format).init();
}

/// JSON structured logging at `DEBUG`.
///
/// # Example output
/// ```json
/// {"timestamp":"2026-01-01T00:00:00.000Z","level":"DEBUG","fields":{"message":"Registering provider","token":"greeting","kind":"value","abstracts":1},"target":"djx"}
/// ```
#[cfg(feature = "logging")]
pub fn init_json() {
    builder().with_format(LogFormat::Json).init();
}

/// Pretty logging at `DEBUG`.
///
/// # Example output
/// ```text
///   2026-01-01T00:00:00.000Z DEBUG djx: Creating injector, scope: "request", parent: Some("main")
/// ```
#[cfg(feature = "logging")]
pub fn init_pretty() {
    builder().with_format(LogFormat::Pretty).init();
}

/// `DEBUG` logging of djx events only.
#[cfg(feature = "logging")]
pub fn init_djx_only() {
    builder().djx_only().init();
}
