use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod error;
mod handlers;
mod media;
mod models;
mod routes;
mod store;
#[cfg(test)]
mod test_support;
mod upload;

use auth::AccessGate;
use config::Config;
use media::CloudinaryClient;
use models::AppState;
use store::FlatFileStore;
use upload::UploadOrchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Refuse to start without every required secret
    let config = Config::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "video_hosting_backend={},tower_http=debug",
            config.log_level
        ))
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tokio::fs::create_dir_all(&config.data_dir).await?;

    let config = Arc::new(config);
    let gate = Arc::new(AccessGate::new(config.credentials.clone()));
    let store = Arc::new(FlatFileStore::new(&config.data_dir));
    store.ensure_collections().await?;
    let host = Arc::new(CloudinaryClient::new(&config.media)?);
    let orchestrator = UploadOrchestrator::new(gate.clone(), host, store.clone());

    print_startup_info(&config, &store);

    let app_state = Arc::new(AppState {
        config: config.clone(),
        gate,
        store,
        orchestrator,
    });
    let app = routes::build_router(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("🚀 Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("✅ Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

fn print_startup_info(config: &Config, store: &FlatFileStore) {
    println!("{}", "=".repeat(60));
    println!("🚀 Video Hosting Backend Starting...");
    println!("{}", "=".repeat(60));
    println!("   Listen: http://0.0.0.0:{}", config.port);
    println!("   Data Dir: {:?}", store.data_dir());
    println!("   Static Dir: {:?}", config.static_dir);
    println!("   Cloud: {}", config.media.cloud_name);
    println!("   Login Mode: {:?}", config.credentials.login_mode);
    println!(
        "   Max Upload: {} MB",
        config.max_file_size / 1024 / 1024
    );
    println!("{}", "=".repeat(60));
}
