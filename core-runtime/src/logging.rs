//! # Logging
//!
//! `tracing`-based logging for the sync engine, installed once at startup.
//!
//! ## Overview
//!
//! [`init_logging`] wires a `tracing-subscriber` registry from a
//! [`LoggingConfig`]: an env-filter style level filter, one formatting layer
//! (pretty for humans, JSON for machines, compact for terse terminals), and
//! an optional credential-redaction layer. Without an explicit filter the
//! workspace crates log at the configured level while the chatty HTTP stack
//! (`h2`, `hyper`, `reqwest`) is damped to `warn`.
//!
//! ## Usage
//!
//! ```no_run
//! use core_runtime::logging::{init_logging, LogLevel, LoggingConfig};
//!
//! # fn main() -> core_runtime::Result<()> {
//! init_logging(LoggingConfig::default().with_level(LogLevel::Debug))?;
//! tracing::info!("Sync engine started");
//! # Ok(())
//! # }
//! ```
//!
//! ## Credential safety
//!
//! Store credentials must never reach the log output. Call sites log hosts
//! and asset keys freely, and pass anything that might be secret through
//! [`redact_if_sensitive`]. Local file paths can be trimmed to their
//! basename with [`strip_path`].

use crate::error::{Error, Result};

use std::io;

use tracing::{Event, Subscriber};
use tracing_subscriber::{
    filter::EnvFilter,
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    Layer,
};

/// Workspace crates the default filter applies the configured level to.
const WORKSPACE_CRATES: &[&str] = &[
    "core_runtime",
    "core_sync",
    "provider_shopify",
    "bridge_traits",
    "bridge_desktop",
];

/// HTTP-stack crates that drown out the sync pipeline below `warn`.
const NOISY_DEPENDENCIES: &[&str] = &["h2", "hyper", "reqwest"];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Minimum level for emitted logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Very verbose tracing
    Trace,
    /// Debugging information
    Debug,
    /// Normal operational messages
    Info,
    /// Something unexpected but recoverable
    Warn,
    /// Failures
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format
    pub format: LogFormat,
    /// Minimum log level
    pub level: LogLevel,
    /// Enable credential redaction
    pub redact_credentials: bool,
    /// Custom filter string (e.g., "core_sync=trace,provider_shopify=debug")
    pub filter: Option<String>,
    /// Enable span contexts for following a change through the pipeline
    pub enable_spans: bool,
    /// Display target module in logs
    pub display_target: bool,
    /// Display thread info
    pub display_thread_info: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            redact_credentials: true,
            filter: None,
            enable_spans: true,
            display_target: true,
            display_thread_info: false,
        }
    }
}

impl LoggingConfig {
    /// Set log format
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set minimum log level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Enable or disable credential redaction
    pub fn with_credential_redaction(mut self, redact: bool) -> Self {
        self.redact_credentials = redact;
        self
    }

    /// Set custom filter string
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Enable or disable span contexts
    pub fn with_spans(mut self, enable: bool) -> Self {
        self.enable_spans = enable;
        self
    }

    /// Enable or disable target display
    pub fn with_target(mut self, display: bool) -> Self {
        self.display_target = display;
        self
    }

    /// Enable or disable thread info
    pub fn with_thread_info(mut self, display: bool) -> Self {
        self.display_thread_info = display;
        self
    }
}

/// Installs the global tracing subscriber.
///
/// Call once during startup; a second call fails because the global
/// subscriber is already set.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = build_filter(&config)?;
    let redaction = config.redact_credentials.then_some(CredentialRedactionLayer);

    tracing_subscriber::registry()
        .with(filter)
        .with(format_layer(&config))
        .with(redaction)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let spec = match &config.filter {
        Some(custom) => custom.clone(),
        None => {
            let level = config.level.as_str();
            WORKSPACE_CRATES
                .iter()
                .map(|krate| format!("{}={}", krate, level))
                .chain(NOISY_DEPENDENCIES.iter().map(|dep| format!("{}=warn", dep)))
                .collect::<Vec<_>>()
                .join(",")
        }
    };

    EnvFilter::try_new(&spec).map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))
}

/// Builds the formatting layer for the configured output format.
///
/// Boxed so the three differently-typed fmt layers share one install path.
fn format_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let base = tracing_subscriber::fmt::layer()
        .with_target(config.display_target)
        .with_thread_ids(config.display_thread_info)
        .with_thread_names(config.display_thread_info)
        .with_writer(io::stdout);

    match config.format {
        LogFormat::Pretty => {
            let span_events = if config.enable_spans {
                tracing_subscriber::fmt::format::FmtSpan::ACTIVE
            } else {
                tracing_subscriber::fmt::format::FmtSpan::NONE
            };
            base.pretty().with_span_events(span_events).boxed()
        }
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.enable_spans)
            .with_span_list(config.enable_spans)
            .boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

/// Marker layer present when credential redaction is on.
///
/// Redaction itself happens at the call sites via [`redact_if_sensitive`];
/// field values cannot be rewritten once an event is emitted.
struct CredentialRedactionLayer;

impl<S> Layer<S> for CredentialRedactionLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, _event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {}
}

/// Names that mark a field value as secret, however it reaches a log call.
const SENSITIVE_MARKERS: &[&str] = &[
    "token",
    "password",
    "secret",
    "api_key",
    "authorization",
    "bearer",
    "credential",
];

/// Masks values that must not appear in logs.
///
/// Field names containing a sensitive marker are fully masked. Values that
/// look like an email address keep their first character and lose the rest.
/// Everything else passes through untouched.
///
/// ```rust
/// use core_runtime::logging::redact_if_sensitive;
///
/// assert_eq!(redact_if_sensitive("password", "hunter2"), "[REDACTED]");
/// assert_eq!(redact_if_sensitive("theme_id", "148460"), "148460");
/// ```
pub fn redact_if_sensitive(field_name: &str, value: &str) -> String {
    let name = field_name.to_lowercase();
    if SENSITIVE_MARKERS.iter().any(|marker| name.contains(marker)) {
        return "[REDACTED]".to_string();
    }

    // Email heuristic: '@' plus a dot anywhere. Asset keys like
    // "assets/icon@2x.png" trip this too; call sites wanting the literal
    // key in logs pass it directly instead of through the redactor.
    if value.contains('@') && value.contains('.') {
        let kept: String = value.chars().take_while(|c| *c != '@').take(1).collect();
        return format!("{}***@[REDACTED]", kept);
    }

    value.to_string()
}

/// Trims a local path to its final component.
///
/// ```rust
/// use core_runtime::logging::strip_path;
///
/// assert_eq!(strip_path("/home/jane/theme/assets/site.css"), "site.css");
/// ```
pub fn strip_path(path: &str) -> &str {
    let tail = path.rsplit('/').next().unwrap_or(path);
    tail.rsplit('\\').next().unwrap_or(tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_workspace_and_damps_http() {
        let config = LoggingConfig::default().with_level(LogLevel::Debug);
        let spec = build_filter(&config).unwrap().to_string();

        assert!(spec.contains("core_sync=debug"));
        assert!(spec.contains("provider_shopify=debug"));
        assert!(spec.contains("hyper=warn"));
        assert!(spec.contains("reqwest=warn"));
    }

    #[test]
    fn test_explicit_filter_replaces_default() {
        let config = LoggingConfig::default().with_filter("core_sync=trace");
        let spec = build_filter(&config).unwrap().to_string();

        assert!(spec.contains("core_sync=trace"));
        assert!(!spec.contains("hyper"));
    }

    #[test]
    fn test_invalid_filter_is_a_config_error() {
        let config = LoggingConfig::default().with_filter("core_sync=not-a-level");
        assert!(build_filter(&config).is_err());
    }

    #[test]
    fn test_builder_round_trip() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_level(LogLevel::Warn)
            .with_credential_redaction(false)
            .with_filter("core_sync=trace")
            .with_spans(false)
            .with_target(false)
            .with_thread_info(true);

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, LogLevel::Warn);
        assert!(!config.redact_credentials);
        assert_eq!(config.filter.as_deref(), Some("core_sync=trace"));
        assert!(!config.enable_spans);
        assert!(!config.display_target);
        assert!(config.display_thread_info);
    }

    #[test]
    fn test_format_default_tracks_build_profile() {
        #[cfg(debug_assertions)]
        assert_eq!(LogFormat::default(), LogFormat::Pretty);

        #[cfg(not(debug_assertions))]
        assert_eq!(LogFormat::default(), LogFormat::Json);
    }

    #[test]
    fn test_levels_order_from_trace_to_error() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_credential_fields_fully_masked() {
        assert_eq!(redact_if_sensitive("api_key", "c2f5ed79"), "[REDACTED]");
        assert_eq!(redact_if_sensitive("password", "hunter2"), "[REDACTED]");
        assert_eq!(
            redact_if_sensitive("authorization", "Basic YWJjOmRlZg=="),
            "[REDACTED]"
        );
        // Marker matching is a substring check on the field name.
        assert_eq!(redact_if_sensitive("shop_api_key", "x"), "[REDACTED]");
    }

    #[test]
    fn test_email_values_keep_first_char_only() {
        let masked = redact_if_sensitive("email", "jane@example.com");
        assert_eq!(masked, "j***@[REDACTED]");
    }

    #[test]
    fn test_plain_values_pass_through() {
        assert_eq!(redact_if_sensitive("theme_id", "148460"), "148460");
        assert_eq!(
            redact_if_sensitive("host", "store-name.myshopify.com"),
            "store-name.myshopify.com"
        );
        assert_eq!(
            redact_if_sensitive("key", "assets/site.css"),
            "assets/site.css"
        );
    }

    #[test]
    fn test_strip_path_handles_both_separators() {
        assert_eq!(strip_path("/srv/shop/theme/assets/site.css"), "site.css");
        assert_eq!(strip_path("C:\\shop\\theme\\assets\\site.css"), "site.css");
        assert_eq!(strip_path("site.css"), "site.css");
        assert_eq!(strip_path("/srv/shop/theme/"), "");
    }
}
