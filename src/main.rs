use blog_server::configuration::get_configuration;
use blog_server::startup::Application;
use blog_server::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = get_configuration().map_err(|e| {
        tracing::error!(error = %e, "Failed to read configuration");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;
    tracing::info!("Configuration loaded successfully");

    let application = Application::build(configuration).await?;
    tracing::info!(port = application.port(), "Server started successfully");

    application.run_until_stopped().await
}
