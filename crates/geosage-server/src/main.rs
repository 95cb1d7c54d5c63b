//! GeoSage — location extraction and geocoding server.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use geosage_geocode::{Geocoder, NoopGeocoder, OpenCageClient};
use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("GEOSAGE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--help" | "-h" | "help" => {
                println!("GeoSage — location extraction and geocoding server");
                println!();
                println!("Usage: geosage");
                println!();
                println!("Environment:");
                println!("  PORT                     Listen port (default 3010)");
                println!("  GEOSAGE_DATA_DIR         Data directory (default ./data)");
                println!("  OPENCAGE_API_KEY         Enables live geocoding");
                println!("  NER_URL                  Inference engine endpoint");
                println!("  NER_LANGUAGES            Loaded NER profiles (default en,xx)");
                println!("  GEOSAGE_MAX_REQUESTS     Default live-request budget per document");
                println!("  GEOSAGE_RETRY_DELAY_MS   Sleep between rate-limited attempts");
                return Ok(());
            }
            other => {
                eprintln!("Unknown command: {}. Use 'geosage help' for usage.", other);
                std::process::exit(1);
            }
        }
    }

    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = geosage_core::GeoSageConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = geosage_store::SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let profiles = geosage_infer::create_profiles(&config.ner_url, &config.ner_languages);

    let geocoder: Arc<dyn Geocoder> = match &config.opencage_api_key {
        Some(key) => Arc::new(OpenCageClient::new(&config.opencage_url, key)),
        None => {
            warn!("OPENCAGE_API_KEY not set, cache misses will resolve as invalid");
            Arc::new(NoopGeocoder)
        }
    };

    // Blocking HTTP clients must be created and dropped outside the async runtime.
    let state = Arc::new(AppState::new(config, store, profiles, geocoder));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(state.clone(), port))?;

    Ok(())
}

async fn serve(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("GeoSage server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
