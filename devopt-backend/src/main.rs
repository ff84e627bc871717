use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

use devopt_backend::config::{find_config_dir, Config};
use devopt_backend::controllers;
use devopt_backend::db::Database;
use devopt_backend::marketplace::seed::seed_sample_data;
use devopt_backend::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(std::io::Error::other)?;
    let port = config.port;

    // Check ./config first, then the workspace layouts; built-in copies cover a missing directory
    let config_dir = find_config_dir();
    match &config_dir {
        Some(dir) => log::info!("Using config directory: {:?}", dir),
        None => log::warn!("Config directory not found, using built-in catalogs"),
    }

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url).map_err(std::io::Error::other)?;
    let db = Arc::new(db);

    if config.seed_sample_data {
        match seed_sample_data(&db, config.admin_password.as_deref()) {
            Ok(true) => log::info!("Seeded sample marketplace data"),
            Ok(false) => {}
            Err(e) => log::error!("Failed to seed sample data: {}", e),
        }
    }

    match db.delete_expired_sessions() {
        Ok(n) if n > 0 => log::info!("Removed {} expired sessions", n),
        Ok(_) => {}
        Err(e) => log::warn!("Failed to clean up expired sessions: {}", e),
    }

    let state = AppState::build(config, db, config_dir.as_deref()).map_err(std::io::Error::other)?;

    // Start scheduler background task
    let (scheduler_shutdown_tx, scheduler_shutdown_rx) = tokio::sync::oneshot::channel();
    if state.config.scheduler_enabled {
        log::info!("Initializing scheduler");
        let scheduler_handle = Arc::clone(&state.scheduler);
        tokio::spawn(async move {
            scheduler_handle.start(scheduler_shutdown_rx).await;
        });
    } else {
        log::info!("Scheduler disabled via DISABLE_SCHEDULER");
    }

    log::info!("Starting DevOpt server on port {}", port);

    let server_state = state.clone();
    let result = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(server_state.clone()))
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::inventory::config)
            .configure(controllers::analytics::config)
            .configure(controllers::auth::config)
            .configure(controllers::marketplace::config)
            .configure(controllers::payments::config)
            .configure(controllers::coordination::config)
            .configure(controllers::scheduler::config)
            .configure(controllers::deploy::config)
            .configure(controllers::github::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await;

    let _ = scheduler_shutdown_tx.send(());
    result
}
