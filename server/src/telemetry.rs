//! Tracing setup and per-request model-call accounting.
//!
//! Console logging is always on. When `OTEL_EXPORTER_OTLP_ENDPOINT` is set and
//! the collector answers, traces and logs are exported over OTLP as well.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::env;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use std::time::Duration;
use tracing::{span::Id, Subscriber};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

const DEFAULT_SERVICE_NAME: &str = "larder-server";

/// Span name the resolver opens around every model call.
const MODEL_CALL_SPAN: &str = "llm.call";

fn collector_reachable(endpoint: &str) -> bool {
    let host_port = endpoint
        .trim_start_matches("http://")
        .trim_start_matches("https://");

    host_port
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| TcpStream::connect_timeout(&addr, Duration::from_millis(100)).is_ok())
        .unwrap_or(false)
}

/// Initialize tracing, with OpenTelemetry export when a collector is reachable.
pub fn init_telemetry() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let endpoint = match env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok() {
        Some(endpoint) if collector_reachable(&endpoint) => endpoint,
        Some(endpoint) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .with(ModelCallCountingLayer)
                .init();
            tracing::info!(endpoint = %endpoint, "OpenTelemetry endpoint not reachable, using console logging only");
            return Ok(());
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .with(ModelCallCountingLayer)
                .init();
            tracing::debug!("OTEL_EXPORTER_OTLP_ENDPOINT not set, using console logging only");
            return Ok(());
        }
    };

    let service_name =
        env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| DEFAULT_SERVICE_NAME.to_string());
    let resource = opentelemetry_sdk::Resource::builder()
        .with_service_name(service_name.clone())
        .build();

    let trace_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()?;
    let trace_provider = SdkTracerProvider::builder()
        .with_batch_exporter(trace_exporter)
        .with_resource(resource.clone())
        .build();
    let tracer = trace_provider.tracer(DEFAULT_SERVICE_NAME);
    opentelemetry::global::set_tracer_provider(trace_provider);

    let log_exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_endpoint(&endpoint)
        .build()?;
    let log_provider = SdkLoggerProvider::builder()
        .with_batch_exporter(log_exporter)
        .with_resource(resource)
        .build();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(ModelCallCountingLayer)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(OpenTelemetryTracingBridge::new(&log_provider))
        .init();

    tracing::info!(
        endpoint = %endpoint,
        service = %service_name,
        "OpenTelemetry enabled, exporting traces and logs"
    );
    Ok(())
}

tokio::task_local! {
    /// Model calls made while serving the current request.
    static MODEL_CALL_COUNTER: Arc<AtomicU32>;
}

/// Counts `llm.call` spans against the task-local request counter.
pub struct ModelCallCountingLayer;

impl<S> Layer<S> for ModelCallCountingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, _attrs: &tracing::span::Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        if span.name() == MODEL_CALL_SPAN {
            let _ = MODEL_CALL_COUNTER.try_with(|counter| {
                counter.fetch_add(1, Ordering::Relaxed);
            });
        }
    }
}

/// Scope a fresh model-call counter around the request and report it in an
/// `X-Model-Call-Count` header.
///
/// Must be layered outside the TraceLayer so the counter covers the whole request.
pub async fn model_call_count_middleware(request: Request<Body>, next: Next) -> Response {
    let counter = Arc::new(AtomicU32::new(0));
    let mut response = MODEL_CALL_COUNTER
        .scope(counter.clone(), next.run(request))
        .await;

    let count = counter.load(Ordering::Relaxed);
    if let Ok(value) = axum::http::header::HeaderValue::from_str(&count.to_string()) {
        response.headers_mut().insert("X-Model-Call-Count", value);
    }
    response
}
