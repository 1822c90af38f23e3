//! Structured logging walkthrough.
//!
//! Replays one simulated sync session so the three output formats can be
//! compared side by side.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug builds)
//! cargo run --example logging_demo
//!
//! # JSON format, as a desktop shell would capture it
//! cargo run --example logging_demo -- json
//!
//! # Compact single-line format
//! cargo run --example logging_demo -- compact
//!
//! # Any format plus a custom filter directive
//! cargo run --example logging_demo -- pretty "core_runtime=trace"
//! ```

use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LogLevel, LoggingConfig,
};
use std::env;
use tracing::{debug, error, info, instrument, span, trace, warn, Level};

#[tokio::main]
async fn main() {
    let mut args = env::args().skip(1);

    let format = match args.next().as_deref() {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some(_) => LogFormat::Pretty,
        None => LogFormat::default(),
    };
    let filter = args.next();

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_credential_redaction(true)
        .with_spans(true)
        .with_target(true);
    if let Some(directive) = filter {
        config = config.with_filter(directive);
    }

    init_logging(config).expect("Failed to initialize logging");
    info!(format = ?format, "logging initialized");

    severity_ladder();
    simulated_batch().await;
    redaction_in_practice();
    drain_queue(&[
        "assets/site.css",
        "layout/theme.liquid",
        "snippets/cart.liquid",
    ])
    .await;

    info!("walkthrough finished");
}

/// One line per severity, handy for checking filter directives.
fn severity_ladder() {
    let span = span!(Level::INFO, "severity_ladder");
    let _enter = span.enter();

    trace!("finest detail, off by default");
    debug!("diagnostic detail");
    info!("routine progress");
    warn!("worth a second look");
    error!("needs operator attention");
}

/// The field-heavy records a real batch produces, inside nested spans.
async fn simulated_batch() {
    let span = span!(Level::INFO, "sync_batch", host = "store-name.myshopify.com");
    let _enter = span.enter();

    info!(theme = "148460", "batch started");

    {
        let admission = span!(Level::DEBUG, "admission");
        let _guard = admission.enter();

        debug!(
            key = "assets/site.css",
            position = 0,
            delay_ms = 0,
            "change admitted"
        );
        debug!(
            key = "layout/theme.liquid",
            position = 5,
            delay_ms = 500,
            "change admitted"
        );
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }

    {
        let dispatch = span!(Level::DEBUG, "dispatch");
        let _guard = dispatch.enter();

        debug!(settled = 2, failed = 0, "slots drained");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }

    info!(uploaded = 2, removed = 0, "batch completed");
}

/// What the redaction helpers do to values that must never reach a log file.
fn redaction_in_practice() {
    let span = span!(Level::INFO, "redaction");
    let _enter = span.enter();

    let password = "2912d08c3a8f97f0a9bbe80719b09446";
    let email = "merchant@example.com";
    let local_file = "/home/jane/theme/assets/site.css";

    info!(
        password = %redact_if_sensitive("password", password),
        email = %redact_if_sensitive("email", email),
        file = %strip_path(local_file),
        "store credentials and local paths, scrubbed"
    );

    // The better habit is to leave the value out of the record entirely.
    info!("connected to store");
}

#[instrument(skip(keys), fields(count = keys.len()))]
async fn drain_queue(keys: &[&str]) {
    info!("instrumented functions open their own span");

    for (slot, key) in keys.iter().enumerate() {
        settle_one(slot, key).await;
    }

    info!("queue drained");
}

#[instrument]
async fn settle_one(slot: usize, key: &str) {
    trace!(key = %key, "settling");
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
}
