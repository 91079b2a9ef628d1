use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sea_orm::Database;
use tracing::info;

use foyer_gate::config::GateConfig;
use foyer_gate::router::build_router;
use foyer_gate::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = GateConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let redis_cfg = deadpool_redis::Config::from_url(&config.redis_url);
    let redis = redis_cfg
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("failed to create Redis pool");

    // Outbound calls (gateway, mailer, CAPTCHA) share one bounded client
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client");

    let addr = format!("0.0.0.0:{}", config.gate_port);
    let state = AppState {
        db,
        redis,
        http,
        config: Arc::new(config),
    };

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("gate service listening on {addr}");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}
