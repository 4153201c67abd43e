use std::sync::Arc;

use page_notes::{
    config,
    handlers::rest,
    repository::Repository,
    service::NoteService,
};

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt::init();

    // Load config
    let cfg = config::load_config().expect("failed to locate or load config file");
    tracing::info!("Successfully loaded page notes config");

    // Repository creation
    match &cfg.storage_path {
        Some(path) => tracing::info!("Storing notes in {}", path.display()),
        None => tracing::warn!("No storage path configured, notes are kept in memory only"),
    }
    let repo = Repository::new(cfg.build_store());
    let repo_ptr = Arc::new(tokio::sync::Mutex::new(repo));

    // Service creation
    let service = Arc::new(NoteService::new(repo_ptr));

    // Router config
    let router = rest::router(service);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cfg.port))
        .await
        .expect("Failed to bind to address");
    let addr = listener.local_addr().expect("listener has no local address");

    // Starting router
    tracing::info!("Page notes server starting, listening on {}", addr);
    axum::serve(listener, router)
        .await
        .expect("failed to start server");
}
