//! Amal Sync Server
//!
//! Serves the Amal REST API backed by a SQLite database.
//!
//! # Configuration
//!
//! Environment variables:
//! - `AMAL_PORT`: Port to listen on (default: 8080)
//! - `AMAL_DATABASE_PATH`: SQLite database file (default: ~/.local/share/amal/amal.db)
//! - `AMAL_JWT_SECRET`: HS256 secret for session tokens (API keys only when unset)
//! - `AMAL_FRONTEND_URL`: Allowed CORS origin (any origin when unset)
//! - `AMAL_STREAK_WINDOW_DAYS`: Days of history scanned for streaks (default: 90)
//! - `AMAL_CONFIG`: Path to config file (default: ~/.config/amal/config.yaml)
//!
//! # Config File Format
//!
//! ```yaml
//! port: 8080
//! database_path: /var/lib/amal/amal.db
//! jwt_secret: "your-secret-here"
//! frontend_url: "https://amal.example.com"
//! ```

use std::net::SocketAddr;

use amal::config::Config;
use amal::db::{init_db, Store};
use amal::server::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amal=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::load(None) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Database: {}", config.database_path.display());
    if config.jwt_secret.is_none() {
        tracing::warn!("No jwt_secret configured - only API keys will authenticate");
    }

    let pool = match init_db(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let state = AppState::new(Store::new(pool), &config);
    let app = router(state, config.frontend_url.as_deref());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
