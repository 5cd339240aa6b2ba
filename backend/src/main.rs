use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::env;

use dfdetect::config::AppConfig;
use dfdetect::inference::backend_loader;
use dfdetect::inference::service::InferenceService;
use dfdetect::routes::{configure_routes, RouteConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::load().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let loader = backend_loader(
        config.model.device,
        config.model.input_size(),
        config.model.channels_first,
    );
    let service = InferenceService::start(&config.model, loader.as_ref());
    match service.loaded_model() {
        Some(loaded) => log::info!("Model loaded from {}", loaded.path.display()),
        None => log::warn!("No model loaded; /predict will answer 503 until restart"),
    }
    let service = web::Data::new(service);

    let routes = RouteConfig {
        frontend_dir: config.server.frontend_dir.clone(),
        max_upload_bytes: config.server.max_upload_bytes,
    };
    let bind_address = config.server.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(service.clone())
            .configure(|cfg| configure_routes(cfg, routes.clone()))
    })
    .bind(&bind_address)?
    .run()
    .await
}
