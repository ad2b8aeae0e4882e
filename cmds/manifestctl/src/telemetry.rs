//! Telemetry setup for tracing and logging.

use std::io::IsTerminal;

use anyhow::Result;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable for service name (not exported by opentelemetry_sdk).
const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

const SERVICE_NAME: &str = "manifestctl";

/// Keeps the tracer provider alive; spans are flushed when dropped.
pub struct TelemetryGuard {
	tracer_provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
	fn drop(&mut self) {
		if let Some(provider) = self.tracer_provider.take() {
			if let Err(e) = provider.shutdown() {
				eprintln!("Failed to shutdown tracer provider: {e}");
			}
		}
	}
}

fn otel_export_enabled() -> bool {
	std::env::var(opentelemetry_otlp::OTEL_EXPORTER_OTLP_ENDPOINT).is_ok()
		|| std::env::var(opentelemetry_otlp::OTEL_EXPORTER_OTLP_TRACES_ENDPOINT).is_ok()
}

/// Parse a `--log-level` value. Unknown values fall back to `RUST_LOG`.
pub fn parse_level(level: &str) -> Option<Level> {
	match level.to_ascii_lowercase().as_str() {
		"trace" => Some(Level::TRACE),
		"debug" => Some(Level::DEBUG),
		"info" => Some(Level::INFO),
		"warn" | "warning" => Some(Level::WARN),
		"error" => Some(Level::ERROR),
		_ => None,
	}
}

/// Initialize tracing with the given log level.
///
/// Priority for log level:
/// 1. `log_level` argument (from --log-level CLI flag)
/// 2. `RUST_LOG` environment variable
/// 3. Default: info
///
/// Logs go to stderr so command output on stdout stays machine-readable;
/// pretty format on a terminal, JSON otherwise. OTLP trace export is enabled
/// when `OTEL_EXPORTER_OTLP_ENDPOINT` or `OTEL_EXPORTER_OTLP_TRACES_ENDPOINT` is set.
pub fn init(log_level: Option<Level>) -> Result<TelemetryGuard> {
	let filter_layer = match log_level {
		Some(level) => EnvFilter::new(level.as_str()),
		None => EnvFilter::builder()
			.with_default_directive(Level::INFO.into())
			.from_env_lossy(),
	};

	let fmt_layer = if std::io::stderr().is_terminal() {
		tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.pretty()
			.boxed()
	} else {
		tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.json()
			.boxed()
	};

	if otel_export_enabled() {
		let (otel_layer, tracer_provider) = init_otel()?;

		tracing_subscriber::registry()
			.with(filter_layer)
			.with(fmt_layer)
			.with(otel_layer)
			.init();

		return Ok(TelemetryGuard {
			tracer_provider: Some(tracer_provider),
		});
	}

	tracing_subscriber::registry()
		.with(filter_layer)
		.with(fmt_layer)
		.init();

	Ok(TelemetryGuard {
		tracer_provider: None,
	})
}

fn init_otel<S>() -> Result<(impl Layer<S>, SdkTracerProvider)>
where
	S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
	use opentelemetry_sdk::Resource;

	// Resource::builder() reads `OTEL_SERVICE_NAME` and `OTEL_RESOURCE_ATTRIBUTES` itself.
	let mut resource_builder = Resource::builder();
	if std::env::var(OTEL_SERVICE_NAME).is_err() {
		resource_builder = resource_builder.with_service_name(SERVICE_NAME);
	}

	let exporter = match std::env::var(opentelemetry_otlp::OTEL_EXPORTER_OTLP_PROTOCOL)
		.as_deref()
		.unwrap_or(opentelemetry_otlp::OTEL_EXPORTER_OTLP_PROTOCOL_DEFAULT)
	{
		"grpc" => opentelemetry_otlp::SpanExporter::builder()
			.with_tonic()
			.build()?,
		_ => opentelemetry_otlp::SpanExporter::builder()
			.with_http()
			.build()?,
	};

	let tracer_provider = SdkTracerProvider::builder()
		.with_resource(resource_builder.build())
		.with_batch_exporter(exporter)
		.build();

	let layer = tracing_opentelemetry::layer()
		.with_error_records_to_exceptions(true)
		.with_tracer(tracer_provider.tracer(SERVICE_NAME));

	opentelemetry::global::set_tracer_provider(tracer_provider.clone());

	Ok((layer, tracer_provider))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_level() {
		assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
		assert_eq!(parse_level("warning"), Some(Level::WARN));
		assert_eq!(parse_level("loud"), None);
	}
}
