use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lbw::config::AppConfig;
use lbw::database;
use lbw::services::notification_service::Mailer;
use lbw::web::{self, AppState};

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lbw=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    info!("Connecting to database: {}", config.database_url);
    let pool = database::connect(&config.database_url).await?;

    if config.mail.to.is_empty() {
        info!("LBW_TO_EMAIL empty, new LBW/activity notifications are off");
    }

    let state = AppState {
        pool,
        mailer: Mailer::new(config.mail.clone()),
        attachment_dir: Arc::new(config.attachment_dir.clone()),
    };
    let app = web::router(state);

    // Fall back to the next port when the configured one is taken.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            let fallback: SocketAddr =
                format!("{}:{}", config.host, config.port.saturating_add(1)).parse()?;
            warn!("Could not bind {}: {}. Trying {}", addr, e, fallback);
            tokio::net::TcpListener::bind(fallback).await?
        }
    };

    info!("Serving on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
