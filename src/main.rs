use actix_web::{middleware, web, App, HttpServer};
use rgenstudio::config::Config;
use rgenstudio::logger::{self, LoggerConfig};
use rgenstudio::server::{self, AppState};
use rgenstudio::{HttpImageFetcher, ImageAdapter, JsonFileStore, ReplicateClient, SelectionStateManager};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    logger::init_with_config(LoggerConfig::from_env())?;
    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = Config::from_env();
    if let Err(e) = config.validate() {
        log::error!("❌ {}", e);
        return Err(e.into());
    }
    logger::log_config_info(&config);

    let http = reqwest::Client::builder()
        .user_agent(concat!("rgenstudio/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let model = config.replicate.model_name().to_string();
    let profile = config.replicate.profile;
    let runner = ReplicateClient::new(http.clone(), config.replicate.clone())?;
    let adapter = ImageAdapter::new(
        Arc::new(runner),
        Arc::new(HttpImageFetcher::new(http)),
        profile,
        model,
    );

    let store = JsonFileStore::new(&config.storage.state_path);
    let studio = SelectionStateManager::new(Arc::new(store));
    let state = web::Data::new(AppState::new(adapter, studio));

    let host = config.server.host.clone();
    let port = config.server.port;
    logger::log_startup_info("rgenstudio", env!("CARGO_PKG_VERSION"), &host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::new("%r %s %Dms"))
            .configure(server::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    log::info!("👋 Server stopped");
    Ok(())
}
