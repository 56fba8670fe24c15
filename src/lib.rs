pub mod ai;
pub mod analytics;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod receipts;
pub mod store;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use ai::GenerativeModel;
use config::Config;
use store::Store;
use utils::TokenKeys;

// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub keys: TokenKeys,
    pub model: Option<Arc<dyn GenerativeModel>>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: Config, model: Option<Arc<dyn GenerativeModel>>) -> Self {
        let keys = TokenKeys::new(&config.jwt_secret, chrono::Duration::days(config.jwt_expiry_days));
        Self { store, config: Arc::new(config), keys, model }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/api/health", get(handlers::health))
        // Auth
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        // Profile
        .route(
            "/api/users/profile",
            get(handlers::users::get_profile)
                .put(handlers::users::update_profile)
                .delete(handlers::users::delete_profile),
        )
        // Transactions
        .route(
            "/api/transactions",
            get(handlers::transactions::list_transactions).post(handlers::transactions::create_transaction),
        )
        .route(
            "/api/transactions/upload-receipt",
            post(handlers::transactions::upload_receipt),
        )
        .route(
            "/api/transactions/upload-history",
            post(handlers::transactions::upload_history),
        )
        .route(
            "/api/transactions/:id",
            put(handlers::transactions::update_transaction).delete(handlers::transactions::delete_transaction),
        )
        // AI
        .route("/api/ai/analyze-receipt", post(handlers::ai::analyze_receipt))
        .route("/api/ai/analyze", post(handlers::ai::analyze_transaction))
        // Analytics
        .route("/api/analytics/summary", get(handlers::analytics::summary))
        .route("/api/analytics/monthly", get(handlers::analytics::monthly))
        .route("/api/analytics/categories", get(handlers::analytics::categories))
        .route("/api/analytics/insights", get(handlers::analytics::insights))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}
