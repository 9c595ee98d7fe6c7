use dotenv::dotenv;
use tracing::{error, info, warn};

use quote_engine::app::app::App;
use quote_engine::util::logger::Logger;

#[tokio::main]
async fn main() {
    let dotenv_result = dotenv();

    // Guards must live as long as the process or buffered file logs are lost.
    let _logger = match Logger::new() {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            std::process::exit(1);
        }
    };

    info!("🚀 Starting quote engine");
    match dotenv_result {
        Ok(_) => info!("✅ Loaded .env file"),
        Err(e) => warn!("⚠️ Failed to load .env file: {} (using system env vars)", e),
    }

    let app = match App::new().await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = app.start().await {
        error!("Server stopped with error: {}", e);
        std::process::exit(1);
    }
}
