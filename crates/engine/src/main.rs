//! Resistencia Engine - Main entry point.

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resistencia_engine::api;
use resistencia_engine::app::{App, Repositories};
use resistencia_engine::infrastructure::{
    backend::{BackendClient, BackendRepositories},
    clock::SystemClock,
    config::EngineConfig,
    ports::ClockPort,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root when run from `crates/engine`.
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "resistencia_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Resistencia Engine");

    let config = EngineConfig::from_env();
    tracing::info!(
        backend_url = %config.backend_url,
        paint_texture_size = config.paint_texture_size,
        paint_time_limit_secs = config.paint_time_limit_secs,
        session_idle_secs = config.session_idle_secs,
        "Configuration loaded"
    );

    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock::new());
    let client = BackendClient::new(&config.backend_url, &config.backend_api_key);
    let repos = Repositories::from(BackendRepositories::new(client));
    let app = Arc::new(App::new(repos, config.paint_rules(), clock));

    // Sweep abandoned sessions
    let sweep_app = app.clone();
    let max_idle = config.session_idle();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(max_idle / 4);
        loop {
            ticker.tick().await;
            sweep_app.use_cases.play.evict_idle(max_idle);
            sweep_app.use_cases.paint.evict_idle(max_idle);
        }
    });

    let mut router = api::http::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer_from_env() {
        router = router.layer(cors);
    }

    let addr = config.socket_addr()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

/// The story player is served from another origin (a static site or the
/// embedded app frames), so browsers preflight its JSON posts.
fn build_cors_layer_from_env() -> Option<CorsLayer> {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
