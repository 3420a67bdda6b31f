//! Logging and span conventions for skill hosts.
//!
//! [`install`] sets up a JSON or text log layer filtered by `RUST_LOG` and,
//! when `ENABLE_OTEL` and `OTEL_EXPORTER_OTLP_ENDPOINT` are set, exports spans
//! over OTLP. [`span_for_skill`] is the span every skill round trip runs in;
//! the skill conversation id and the response status are recorded on it once
//! known.

use anyhow::Result;
use tracing::{Span, field, info_span};

mod config;
mod tracing_init;

pub use config::{LogFormat, OtlpExport, TelemetryConfig, TelemetryProtocol};
pub use tracing_init::{TelemetryGuard, install_with};

/// Installs the subscriber configured from the environment.
pub fn install(service_name: &str) -> Result<TelemetryGuard> {
    install_with(&TelemetryConfig::from_env(
        service_name,
        env!("CARGO_PKG_VERSION"),
    ))
}

/// Span of one activity posted to a skill.
pub fn span_for_skill(skill_id: &str, activity_type: &str) -> Span {
    info_span!(
        "skill.round_trip",
        skill = %skill_id,
        activity_type = %activity_type,
        skill_conversation_id = field::Empty,
        status = field::Empty,
    )
}

pub fn record_skill_conversation(span: &Span, skill_conversation_id: &str) {
    span.record("skill_conversation_id", field::display(skill_conversation_id));
}

pub fn record_status(span: &Span, status: u16) {
    span.record("status", status);
}
