use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rustikop::config::{Config, WebhookMode};
use rustikop::db::{self, AppState};

#[derive(Parser)]
#[command(name = "rustikop", version, about = "Checkout and order backend for the Rustikop studio")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (the default when no command is given)
    Serve,
    /// Create the database schema and exit
    InitDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Command::Serve) {
        Command::InitDb => {
            let pool = db::create_pool(&config.database_path)?;
            let conn = pool.get()?;
            db::init_schema(&conn)?;
            tracing::info!(path = %config.database_path, "Database initialized");
            Ok(())
        }
        Command::Serve => serve(config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;

    match &state.webhook_mode {
        Some(WebhookMode::Verified(_)) => {
            tracing::info!("Webhook signature verification enabled");
        }
        Some(WebhookMode::DevUnverified) => {
            tracing::warn!(
                "Running in dev mode without STRIPE_WEBHOOK_SECRET; webhook events will NOT be verified"
            );
        }
        None => {
            tracing::warn!(
                "STRIPE_WEBHOOK_SECRET is not set; the webhook endpoint will refuse events"
            );
        }
    }
    if state.stripe.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY is not set; checkout sessions cannot be created");
    }
    if state.admin_secret.is_none() {
        tracing::warn!("ADMIN_SECRET is not set; admin endpoints accept unauthenticated requests");
    }
    if config.notify_webhook_url.is_none() {
        tracing::info!("NOTIFY_WEBHOOK_URL is not set; order notifications are disabled");
    }
    tracing::info!(
        per_minute = config.checkout_rate_limit,
        "Checkout rate limit configured"
    );

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Listening");
    axum::serve(listener, rustikop::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutting down");
}
