use std::sync::Arc;

use talentmatch::ai::ollama::OllamaProvider;
use talentmatch::config::EngineConfig;
use talentmatch::db;
use talentmatch::engine::MatchingEngine;
use talentmatch::http::{router, AppState};
use talentmatch::jobs::{JobExecutor, JobRepository};
use talentmatch::logging;
use talentmatch::store::SqliteStore;

#[tokio::main]
async fn main() {
    logging::init_logging();
    logging::setup_panic_hook();

    if let Err(e) = db::init_database() {
        eprintln!("Failed to initialize database: {}", e);
        std::process::exit(1);
    }

    let config = EngineConfig::from_env();
    log::info!("[main] Reference date: {}", config.reference_date);

    let store = match SqliteStore::open_default() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Failed to open database: {}", e);
            std::process::exit(1);
        }
    };

    let provider = Arc::new(OllamaProvider::new(
        &config.ollama_host,
        &config.chat_model,
        &config.embed_model,
    ));

    let engine = match MatchingEngine::new(store, provider, config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            eprintln!("Failed to construct matching engine: {}", e);
            std::process::exit(1);
        }
    };

    let repo = JobRepository::new();
    let executor = JobExecutor::start(Arc::clone(&engine), repo.clone(), config.max_workers);

    let app = router(AppState { executor, repo });

    let listener = match tokio::net::TcpListener::bind(&config.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };

    log::info!("[main] Listening on {}", config.listen_addr);
    println!("TalentMatch API listening on {}", config.listen_addr);

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
