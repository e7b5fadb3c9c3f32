use anyhow::Context;
use ecraspay::api::{self, AppState};
use ecraspay::config::Config;
use ecraspay::database::payment_repository::PaymentRepository;
use ecraspay::database::{self, PoolConfig};
use ecraspay::payments::{load_public_key, EcrasPay, GatewayConfig};
use ecraspay::services::PaymentService;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let gateway_config = GatewayConfig::from_env().context("EcrasPay gateway configuration")?;

    tracing::info!("Starting EcrasPay payment service");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Gateway environment: {}", gateway_config.environment);
    if let Some(webhook_url) = &gateway_config.webhook_url {
        tracing::info!("Gateway webhook URL: {}", webhook_url);
    }

    let pool = database::init_pool(
        &config.database.url,
        Some(PoolConfig::default().with_max_connections(config.database.max_connections)),
    )
    .await?;
    database::run_migrations(&pool).await?;
    database::health_check(&pool).await?;

    let sdk = EcrasPay::new(gateway_config)?;
    let store = Arc::new(PaymentRepository::new(pool));
    let mut state = AppState::new(PaymentService::new(sdk, store));

    if let Some(key) = config.card.public_key.as_deref() {
        state = state.with_card_public_key(
            load_public_key(key).context("failed to load ECRASPAY_CARD_PUBLIC_KEY")?,
        );
        tracing::info!("Server-side card encryption enabled");
    }

    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("HOST and PORT must form a valid socket address")?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
