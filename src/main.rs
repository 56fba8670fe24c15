use std::sync::Arc;

use dotenvy::dotenv;

use finance_tracker::{
    ai::{GeminiClient, GenerativeModel},
    config::{Config, StorageBackend},
    create_router,
    database::create_database_pool,
    store::{MemoryStore, PgStore, Store},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Postgres => {
            let url = config.database_url.as_deref().unwrap_or_default();
            let db = create_database_pool(url).await?;
            Arc::new(PgStore::new(db))
        }
        StorageBackend::Memory => {
            log::warn!("using in-memory storage, data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let model: Option<Arc<dyn GenerativeModel>> = match &config.gemini {
        Some(gemini) => {
            log::info!("receipt analysis uses {}", gemini.model);
            let client: Arc<dyn GenerativeModel> = Arc::new(GeminiClient::new(gemini)?);
            Some(client)
        }
        None => {
            log::info!("GOOGLE_API_KEY not set, receipt analysis runs locally");
            None
        }
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let app = create_router(AppState::new(store, config, model));

    log::info!("Finance tracker server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
