use rango::{
    configuration::get_configuration,
    startup,
    telementry::{get_subscriber, init_subscriber},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = get_configuration()?;

    let subscriber = get_subscriber(
        "rango".into(),
        "info".into(),
        std::io::stdout,
        cfg.environment,
        cfg.telemetry.otlp_endpoint.as_deref(),
    )?;
    init_subscriber(subscriber)?;

    let result = startup::run(cfg).await;
    opentelemetry::global::shutdown_tracer_provider();
    result
}
