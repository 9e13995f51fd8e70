//! Greetly API server

use axum::{
    routing::{get, post},
    Router,
};
use dispatcher::{
    Dispatcher, HandlerRegistry, PrOpenedHandler, PrSynchronizeHandler, PushHandler,
    TracingObserver,
};
use github::AppAuth;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api=debug".parse()?)
                .add_directive("dispatcher=debug".parse()?)
                .add_directive("github=debug".parse()?),
        )
        .init();

    info!("👋 Starting Greetly");

    // Load configuration and App credentials
    let config = common::Config::from_env()?;
    let private_key = config.read_private_key()?;
    let auth = AppAuth::new(config.github_app_id.clone(), &private_key)?;

    // Register handlers; the registry is read-only from here on
    let mut registry = HandlerRegistry::new();
    registry.register("pull_request", Some("opened"), Arc::new(PrOpenedHandler));
    registry.register(
        "pull_request",
        Some("synchronize"),
        Arc::new(PrSynchronizeHandler),
    );
    registry.register("push", None, Arc::new(PushHandler));
    info!("{} handlers registered", registry.len());

    let dispatcher = Dispatcher::new(
        config.github_webhook_secret.clone(),
        registry,
        Arc::new(auth),
        Arc::new(TracingObserver),
    );
    let app_state = Arc::new(AppState { dispatcher });

    let app = Router::new()
        .route("/", get(routes::health::health))
        .route("/api/webhook", post(routes::webhooks::github))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    info!("🚀 Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
