use std::sync::Arc;

use nosh::config::Config;
use nosh::handler::ChatService;
use nosh::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    dotenvy::dotenv().ok();

    tracing::info!("nosh starting");

    let config = Config::from_env();
    let bind = config.bind.clone();
    let service = Arc::new(ChatService::new(config));

    server::serve(service, &bind).await?;

    tracing::info!("nosh shutting down");
    Ok(())
}
