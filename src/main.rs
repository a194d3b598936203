use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use venue_rewards_api::database::DatabaseManager;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, VENUE_TIMEZONE, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = venue_rewards_api::config::config();
    tracing::info!(
        "Starting venue rewards API in {:?} mode (venue tz: {})",
        config.environment,
        config.venue.timezone
    );

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("REWARDS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("venue rewards API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(rule_routes())
        .merge(reward_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn rule_routes() -> Router {
    use venue_rewards_api::handlers::rules;

    Router::new()
        .route(
            "/api/gift-rules",
            get(rules::rule_list).post(rules::rule_create),
        )
        .route(
            "/api/gift-rules/:id",
            get(rules::rule_get)
                .put(rules::rule_update)
                .delete(rules::rule_delete),
        )
}

fn reward_routes() -> Router {
    use axum::routing::{post, put};
    use venue_rewards_api::handlers::rewards;

    Router::new()
        .route(
            "/api/rewards/guest-list/:id/evaluate",
            post(rewards::guest_list_evaluate),
        )
        .route(
            "/api/rewards/guest-list/:id/gifts",
            get(rewards::guest_list_gifts),
        )
        .route(
            "/api/rewards/promoter/:promoter_id/events/:event_id",
            get(rewards::promoter_progress),
        )
        .route(
            "/api/rewards/gifts/:grant_id/deliver",
            put(rewards::gift_deliver),
        )
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Venue Rewards API",
            "version": version,
            "description": "Check-in driven reward eligibility engine",
            "endpoints": {
                "home": "/",
                "health": "/health",
                "rules": "/api/gift-rules[/:id]",
                "evaluate": "/api/rewards/guest-list/:id/evaluate",
                "gifts": "/api/rewards/guest-list/:id/gifts",
                "promoter_progress": "/api/rewards/promoter/:promoter_id/events/:event_id",
                "deliver": "/api/rewards/gifts/:grant_id/deliver",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
