use std::sync::OnceLock;

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, propagation::TraceContextPropagator, trace::SdkTracerProvider};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, OtlpExport, TelemetryConfig, TelemetryProtocol};

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Keeps the span exporter alive; dropping it flushes pending spans.
#[must_use = "dropping the guard stops span export"]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl TelemetryGuard {
    pub fn exports_spans(&self) -> bool {
        self.provider.is_some()
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(err) = provider.shutdown() {
                tracing::warn!(error = %err, "span exporter shutdown failed");
            }
        }
    }
}

/// Installs the process-wide subscriber. Only the first call has an effect;
/// later calls return an inert guard.
pub fn install_with(config: &TelemetryConfig) -> Result<TelemetryGuard> {
    if INSTALLED.set(()).is_err() {
        return Ok(TelemetryGuard { provider: None });
    }

    let filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("invalid log filter `{}`", config.filter))?;
    let provider = config
        .otlp
        .as_ref()
        .map(|otlp| tracer_provider(config, otlp))
        .transpose()?;

    let otel_layer = provider
        .as_ref()
        .map(|provider| OpenTelemetryLayer::new(provider.tracer(config.service_name.clone())));
    let (json_layer, text_layer) = match config.log_format {
        LogFormat::Json => (Some(fmt::layer().json().flatten_event(true)), None),
        LogFormat::Text => (None, Some(fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(otel_layer)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    if let Some(provider) = &provider {
        global::set_text_map_propagator(TraceContextPropagator::new());
        global::set_tracer_provider(provider.clone());
    }
    Ok(TelemetryGuard { provider })
}

fn tracer_provider(config: &TelemetryConfig, otlp: &OtlpExport) -> Result<SdkTracerProvider> {
    let exporter = match otlp.protocol {
        TelemetryProtocol::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(otlp.endpoint.clone())
            .build(),
        TelemetryProtocol::HttpProtobuf => SpanExporter::builder()
            .with_http()
            .with_endpoint(otlp.endpoint.clone())
            .build(),
    }
    .with_context(|| format!("failed to build OTLP exporter for {}", otlp.endpoint))?;

    Ok(SdkTracerProvider::builder()
        .with_resource(host_resource(config))
        .with_batch_exporter(exporter)
        .build())
}

fn host_resource(config: &TelemetryConfig) -> Resource {
    let mut attributes = vec![
        KeyValue::new("service.version", config.service_version.clone()),
        KeyValue::new("deployment.environment", config.environment.clone()),
    ];
    if let Some(bot_id) = &config.bot_id {
        attributes.push(KeyValue::new("skill_host.bot_id", bot_id.clone()));
    }
    Resource::builder_empty()
        .with_service_name(config.service_name.clone())
        .with_attributes(attributes)
        .build()
}
