use dotenv::dotenv;
use tracing::{info, warn};

use startronics_backend::app::app::App;
use startronics_backend::util::logger::Logger;

#[tokio::main]
async fn main() {
    // Console plus rolling file output; guards must outlive the server.
    let _logger = Logger::new().expect("Failed to initialize logging");

    info!("🚀 Starting StarTronics Backend");

    // Load environment variables from .env file
    match dotenv() {
        Ok(_) => info!("✅ Successfully loaded .env file"),
        Err(e) => warn!("⚠️ Failed to load .env file: {} (using system env vars)", e),
    }

    let app = App::new().await;
    app.start().await;
}
