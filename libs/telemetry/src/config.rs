use std::env;

/// Wire protocol of the OTLP span exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryProtocol {
    Grpc,
    HttpProtobuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Where skill round-trip spans are exported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtlpExport {
    pub endpoint: String,
    pub protocol: TelemetryProtocol,
}

/// Logging and tracing settings of a skill host process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub environment: String,
    /// App id of the root bot; attached to every exported span.
    pub bot_id: Option<String>,
    /// `EnvFilter` directives.
    pub filter: String,
    pub log_format: LogFormat,
    /// `None` keeps spans local to the log output.
    pub otlp: Option<OtlpExport>,
}

const DEFAULT_FILTER: &str = "info";

impl TelemetryConfig {
    pub fn from_env(service_name: &str, service_version: &str) -> Self {
        Self::from_lookup(|key| env::var(key).ok(), service_name, service_version)
    }

    pub fn from_lookup<F>(lookup: F, service_name: &str, service_version: &str) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let log_format = match non_blank("LOG_FORMAT").map(|v| v.to_lowercase()).as_deref() {
            Some("text" | "pretty" | "plain") => LogFormat::Text,
            _ => LogFormat::Json,
        };
        let export_requested = non_blank("ENABLE_OTEL")
            .is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"));
        let otlp = non_blank("OTEL_EXPORTER_OTLP_ENDPOINT")
            .filter(|_| export_requested)
            .map(|endpoint| OtlpExport {
                endpoint,
                protocol: match non_blank("OTEL_EXPORTER_OTLP_PROTOCOL").as_deref() {
                    Some("http" | "http/protobuf") => TelemetryProtocol::HttpProtobuf,
                    _ => TelemetryProtocol::Grpc,
                },
            });

        Self {
            service_name: non_blank("OTEL_SERVICE_NAME").unwrap_or_else(|| service_name.to_string()),
            service_version: service_version.to_string(),
            environment: non_blank("DEPLOYMENT_ENV").unwrap_or_else(|| "dev".into()),
            bot_id: non_blank("SKILL_HOST_BOT_ID"),
            filter: non_blank("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.into()),
            log_format,
            otlp,
        }
    }

    pub fn exports_spans(&self) -> bool {
        self.otlp.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> TelemetryConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        TelemetryConfig::from_lookup(|key| vars.get(key).cloned(), "skill-host", "1.0.0")
    }

    #[test]
    fn defaults_to_local_json_logs() {
        let cfg = config(&[]);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.filter, "info");
        assert_eq!(cfg.service_name, "skill-host");
        assert_eq!(cfg.environment, "dev");
        assert!(cfg.bot_id.is_none());
        assert!(!cfg.exports_spans());
    }

    #[test]
    fn export_needs_flag_and_endpoint() {
        assert!(!config(&[("ENABLE_OTEL", "true")]).exports_spans());
        assert!(!config(&[("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4317")]).exports_spans());
        assert!(
            !config(&[("ENABLE_OTEL", "true"), ("OTEL_EXPORTER_OTLP_ENDPOINT", "  ")]).exports_spans()
        );

        let cfg = config(&[
            ("ENABLE_OTEL", "on"),
            ("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4318"),
            ("OTEL_EXPORTER_OTLP_PROTOCOL", "http/protobuf"),
        ]);
        assert_eq!(
            cfg.otlp,
            Some(OtlpExport {
                endpoint: "http://collector:4318".into(),
                protocol: TelemetryProtocol::HttpProtobuf,
            })
        );
    }

    #[test]
    fn reads_host_identity_and_filter() {
        let cfg = config(&[
            ("SKILL_HOST_BOT_ID", "root-bot"),
            ("RUST_LOG", "skillgate_dialogs=debug"),
            ("LOG_FORMAT", "pretty"),
            ("DEPLOYMENT_ENV", "staging"),
        ]);
        assert_eq!(cfg.bot_id.as_deref(), Some("root-bot"));
        assert_eq!(cfg.filter, "skillgate_dialogs=debug");
        assert_eq!(cfg.log_format, LogFormat::Text);
        assert_eq!(cfg.environment, "staging");
    }
}
