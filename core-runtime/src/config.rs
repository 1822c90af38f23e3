//! Runtime configuration for a sync session.
//!
//! A [`CoreConfig`] bundles everything one sync run needs: store credentials,
//! the theme being targeted, throttle settings, and the bridge adapters the
//! engine calls out through. Construction goes through
//! [`CoreConfig::builder()`], which refuses to produce a config with missing
//! or blank required fields, so a run can never start half-wired.
//!
//! Required: API key, API password, host, and a theme target (a concrete id
//! via [`theme_id()`](CoreConfigBuilder::theme_id) or the live theme via
//! [`published_theme()`](CoreConfigBuilder::published_theme)).
//!
//! Everything else has a default: the base path falls back to the working
//! directory, the base delay to zero, burst capacity to
//! [`DEFAULT_BURST_CAPACITY`], the HTTP client to the desktop adapter when
//! the `desktop-shims` feature is on, and the notifier to none.
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .api_key("c2f5ed...")
//!     .password("2912d0...")
//!     .host("store-name.myshopify.com")
//!     .theme_id("148460")
//!     .base_path("shop/theme")
//!     .burst_capacity(36)
//!     .base_delay(Duration::from_millis(500))
//!     .build()?;
//! ```
//!
//! Builder errors name the setter that fixes them:
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Panics: password, host, and theme target were never set.
//! CoreConfig::builder()
//!     .api_key("c2f5ed...")
//!     .build()
//!     .expect("missing required settings");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, Notifier, ThemeId, ThemeTarget};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Calls permitted immediately before throttling begins.
///
/// Matches the remote API's documented bucket size. Deployment profiles that
/// share the bucket with other tooling lower this to 36.
pub const DEFAULT_BURST_CAPACITY: u64 = 40;

/// Upper bound for the flat per-call delay; anything larger is a misconfiguration.
const MAX_BASE_DELAY: Duration = Duration::from_secs(60);

/// Everything one sync run needs, already validated.
///
/// Instances come from [`CoreConfig::builder()`]. Fields are public because
/// the queue and connector read them directly.
#[derive(Clone)]
pub struct CoreConfig {
    /// Remote API key (private app credential)
    pub api_key: String,

    /// Remote API password (private app credential)
    pub password: String,

    /// Store host, scheme-free, e.g. `store-name.myshopify.com`
    pub host: String,

    /// Which theme uploads and removals address
    pub theme: ThemeTarget,

    /// Local directory asset keys are computed relative to.
    /// `None` means the current working directory, resolved once by the
    /// key mapper at queue construction.
    pub base_path: Option<PathBuf>,

    /// Flat extra delay applied to every call as a floor
    pub base_delay: Duration,

    /// Calls permitted before throttling begins
    pub burst_capacity: u64,

    /// HTTP client for remote calls (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Desktop notification surface for per-file outcomes (optional)
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_key", &"[REDACTED]")
            .field("password", &"[REDACTED]")
            .field("host", &self.host)
            .field("theme", &self.theme)
            .field("base_path", &self.base_path)
            .field("base_delay", &self.base_delay)
            .field("burst_capacity", &self.burst_capacity)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("notifier", &self.notifier.as_ref().map(|_| "Notifier { ... }"))
            .finish()
    }
}

fn require_non_blank(value: &str, label: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!("{} cannot be blank", label)));
    }
    Ok(())
}

impl CoreConfig {
    /// Starts an empty builder.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Checks field contents after the builder has established presence.
    ///
    /// Rejects blank credentials, a host that kept its scheme prefix, a
    /// blank theme id, and a base delay past [`MAX_BASE_DELAY`].
    pub fn validate(&self) -> Result<()> {
        require_non_blank(&self.api_key, "API key")?;
        require_non_blank(&self.password, "API password")?;
        require_non_blank(&self.host, "Host")?;

        if self.host.contains("://") {
            return Err(Error::Config(format!(
                "Host must be a bare domain like 'store-name.myshopify.com', got '{}'",
                self.host
            )));
        }

        if let Some(id) = self.theme.theme_id() {
            require_non_blank(id.as_str(), "Theme id")?;
        }

        if self.base_delay > MAX_BASE_DELAY {
            return Err(Error::Config(
                "Base delay exceeds maximum of 60 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// Strip a scheme prefix and trailing slashes from a configured host.
///
/// Config files commonly carry `https://store.myshopify.com/`; the connector
/// wants the bare domain.
fn normalize_host(host: &str) -> String {
    let trimmed = host.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').to_string()
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for remote API calls. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Custom: inject an adapter via .http_client()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

/// Accumulates settings for a [`CoreConfig`].
///
/// Setters can run in any order; nothing is checked until
/// [`build()`](CoreConfigBuilder::build), which reports the first problem it
/// finds with the setter that fixes it.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_key: Option<String>,
    password: Option<String>,
    host: Option<String>,
    theme: Option<ThemeTarget>,
    base_path: Option<PathBuf>,
    base_delay: Option<Duration>,
    burst_capacity: Option<u64>,
    http_client: Option<Arc<dyn HttpClient>>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl CoreConfigBuilder {
    /// Sets the remote API key (required).
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the remote API password (required).
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the store host (required).
    ///
    /// Accepts a bare domain like `store-name.myshopify.com`; a scheme prefix
    /// or trailing slash is stripped.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Targets a specific theme by id (required unless
    /// [`published_theme()`](Self::published_theme) is used).
    pub fn theme_id(mut self, id: impl Into<ThemeId>) -> Self {
        self.theme = Some(ThemeTarget::Theme(id.into()));
        self
    }

    /// Targets the currently published theme via the legacy no-id route.
    pub fn published_theme(mut self) -> Self {
        self.theme = Some(ThemeTarget::Published);
        self
    }

    /// Sets the local base path asset keys are computed relative to.
    ///
    /// Default: the process's current working directory.
    pub fn base_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets a flat extra delay applied to every call as a floor.
    ///
    /// Default: zero. Deployment profiles sharing the API quota with other
    /// tooling use up to one second.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    /// Sets the number of calls permitted before throttling begins.
    ///
    /// Default: [`DEFAULT_BURST_CAPACITY`] (40).
    pub fn burst_capacity(mut self, capacity: u64) -> Self {
        self.burst_capacity = Some(capacity);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the desktop notification surface (optional).
    ///
    /// When present, every upload/removal outcome also produces a
    /// notification triplet; without it, outcomes appear only in logs.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Turns the accumulated settings into a validated [`CoreConfig`].
    ///
    /// # Errors
    ///
    /// - A credential, the host, or the theme target is missing or blank
    /// - No HTTP client is available (and `desktop-shims` is disabled)
    /// - A setting is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let api_key = self.api_key.ok_or_else(|| {
            Error::Config("API key is required. Use .api_key() to set it.".to_string())
        })?;

        let password = self.password.ok_or_else(|| {
            Error::Config("API password is required. Use .password() to set it.".to_string())
        })?;

        let host = self.host.ok_or_else(|| {
            Error::Config("Host is required. Use .host() to set it.".to_string())
        })?;

        let theme = self.theme.ok_or_else(|| {
            Error::Config(
                "Theme target is required. Use .theme_id() to set it, \
                 or .published_theme() to target the live theme."
                    .to_string(),
            )
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let config = CoreConfig {
            api_key,
            password,
            host: normalize_host(&host),
            theme,
            base_path: self.base_path,
            base_delay: self.base_delay.unwrap_or(Duration::ZERO),
            burst_capacity: self.burst_capacity.unwrap_or(DEFAULT_BURST_CAPACITY),
            http_client: Some(http_client),
            notifier: self.notifier,
        };

        config.validate()?;

        Ok(config)
    }
}
