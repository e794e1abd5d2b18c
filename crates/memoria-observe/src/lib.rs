//! Observability setup for Memoria: tracing subscriber and optional
//! OpenTelemetry export.

pub mod tracing_setup;
