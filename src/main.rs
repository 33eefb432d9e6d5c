mod auth;
mod config;
mod db;
mod registry;
mod relay;
mod routes;
mod state;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use config::{generate_config_template, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "hotline_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "hotline_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("Hotline server v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite account store
    let db = db::init_db(&config.data_dir)?;

    // Load or generate JWT signing key (256-bit random, stored in data_dir)
    let jwt_secret = auth::jwt::load_or_generate_jwt_secret(&config.data_dir)?;

    // Build application state. The presence registry starts empty; bindings
    // exist only while their connections are live.
    let app_state = state::AppState {
        db,
        jwt_secret,
        registry: Arc::new(registry::Registry::new()),
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
