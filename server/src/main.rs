mod handlers;
mod routes;
mod state;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use feed_scraper_cli::{ai::QuestionAnswerer, config::AppConfig};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use routes::app;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    let api_key = config.api_key();
    if api_key.is_none() {
        warn!("no OPENAI_API_KEY found, questions will be answered with an error");
    }
    let answerer = QuestionAnswerer::new(api_key)
        .with_model(config.model.clone())
        .with_base_url(config.base_url.clone());

    let cors = match &config.client_url {
        Some(client_url) => CorsLayer::new()
            .allow_origin(
                client_url
                    .parse::<HeaderValue>()
                    .context("CLIENT_URL is not a valid origin")?,
            )
            .allow_methods([Method::POST, Method::GET, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]),
        None => CorsLayer::new(),
    };

    let addr = config.server_addr.clone();
    let app = app(AppState::new(config, answerer)).layer(cors);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
