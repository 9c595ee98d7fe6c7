use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::info;

use crate::config::{AppConfig, MongoConfig, QuoteConfig};
use crate::repository::booking_repo::MongoBookingRepository;
use crate::repository::directory_repo::MongoDirectoryRepository;
use crate::repository::mongo_client;
use crate::repository::quote_repo::MongoQuoteRepository;
use crate::router::quote_router::quote_router;
use crate::service::quote_lifecycle::QuoteLifecycle;
use crate::service::quote_service::QuoteServiceImpl;
use crate::util::clock::SystemClock;

pub struct App {
    config: AppConfig,
    router: Router,
    pub quote_service: Arc<QuoteServiceImpl>,
}

impl App {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::from_env();
        let mongo_config = MongoConfig::from_env()?;
        let quote_config = QuoteConfig::from_env()?;

        let database = mongo_client::connect(&mongo_config).await?;
        let quote_repo = MongoQuoteRepository::new(&database, &mongo_config);
        quote_repo.ensure_indexes().await?;
        let directory_repo = MongoDirectoryRepository::new(&database);
        let booking_repo = MongoBookingRepository::new(&database, &mongo_config);

        let lifecycle = QuoteLifecycle::new(&quote_config, Arc::new(SystemClock));
        let quote_service = Arc::new(QuoteServiceImpl::new(
            Arc::new(quote_repo),
            Arc::new(directory_repo),
            Arc::new(booking_repo),
            lifecycle,
            quote_config,
        ));

        let router = App::create_router(quote_service.clone());
        Ok(App { config, router, quote_service })
    }

    pub fn create_router(quote_service: Arc<QuoteServiceImpl>) -> Router {
        Router::new()
            .merge(quote_router(quote_service))
            .route("/health", get(|| async { "OK" }))
    }

    pub async fn start(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.config.socket_addr()?;
        info!("🚀 Quote engine listening at http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}
