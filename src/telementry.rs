use opentelemetry_otlp::WithExportConfig;
use tracing::{Subscriber, subscriber::set_global_default};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt};

use opentelemetry::KeyValue;
use opentelemetry_otlp::SpanExporter;
use opentelemetry_sdk::{Resource, runtime, trace as sdktrace};

use opentelemetry_semantic_conventions::resource::SERVICE_NAME;

use crate::configuration::Environment;

/// Bunyan-formatted JSON logs to `sink`, plus OTLP span export when an
/// endpoint is given. Must be called inside a tokio runtime when exporting.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
    environment: Environment,
    otlp_endpoint: Option<&str>,
) -> anyhow::Result<impl Subscriber + Send + Sync>
where
    Sink: for<'a> tracing_subscriber::fmt::MakeWriter<'a> + Sync + Send + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));

    let telemetry_layer = match otlp_endpoint {
        Some(endpoint) => {
            let exporter = SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()?;

            let tracer_provider = sdktrace::TracerProvider::builder()
                .with_batch_exporter(exporter, runtime::Tokio)
                .with_resource(service_resource(&name, environment))
                .build();

            let tracer =
                opentelemetry::trace::TracerProvider::tracer(&tracer_provider, "rango-tracer");
            // registered globally so `shutdown_tracer_provider` flushes it on exit
            opentelemetry::global::set_tracer_provider(tracer_provider);

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    Ok(Registry::default()
        .with(env_filter)
        .with(telemetry_layer)
        .with(JsonStorageLayer)
        .with(BunyanFormattingLayer::new(name, sink)))
}

/// Attributes attached to every exported span.
fn service_resource(name: &str, environment: Environment) -> Resource {
    Resource::new(vec![
        KeyValue::new(SERVICE_NAME, name.to_string()),
        KeyValue::new("environment", environment.to_str()),
    ])
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> anyhow::Result<()> {
    LogTracer::init()?;
    set_global_default(subscriber)?;
    Ok(())
}
