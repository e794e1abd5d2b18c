//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! use memoria_types::config::LoggingConfig;
//!
//! memoria_observe::tracing_setup::init_tracing(&LoggingConfig::default()).unwrap();
//! // ... run the application ...
//! memoria_observe::tracing_setup::shutdown_tracing();
//! ```

use std::sync::OnceLock;

use memoria_types::config::LoggingConfig;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Level used when neither `RUST_LOG` nor the configured level parses.
const FALLBACK_DIRECTIVE: &str = "info";

/// Pick the filter directive: `RUST_LOG` wins over the configured level.
fn filter_directive(config: &LoggingConfig, rust_log: Option<String>) -> String {
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    let directive = filter_directive(config, std::env::var("RUST_LOG").ok());
    EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("Warning: invalid log filter '{directive}': {err}, using '{FALLBACK_DIRECTIVE}'");
        EnvFilter::new(FALLBACK_DIRECTIVE)
    })
}

/// Initialize the global tracing subscriber.
///
/// - Installs a `fmt` layer, human-readable or JSON lines per `config.json`,
///   with target visibility and span close timing.
/// - When `config.otel` is set, additionally bridges spans to OpenTelemetry
///   using the stdout exporter.
/// - `RUST_LOG` overrides `config.level`.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (plain_layer, json_layer) = if config.json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE);
        (Some(layer), None)
    };

    let otel_layer = if config.otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("memoria");

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(plain_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// No-op when OTel was not enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}
