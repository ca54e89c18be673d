use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use tracing::{info, warn};

use agora::config::Config;
use agora::core::seed::init_demo_data;
use agora::{handlers, AppState};

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("agora=info,actix_web=info"));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("failed to load configuration")?;
    init_tracing(config.log_json);

    let bind_addr = config.bind_addr.clone();
    let seed_demo = config.seed_demo;
    let state = AppState::new(config);

    if seed_demo {
        if let Err(e) = init_demo_data(&state.store) {
            warn!(error = %e, "demo data not seeded");
        }
    }

    info!(addr = %bind_addr, "server listening");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .configure(handlers::configure)
            .default_service(web::route().to(|| async {
                HttpResponse::NotFound().json(serde_json::json!({"error": "No route found"}))
            }))
    })
    .bind(&bind_addr)
    .with_context(|| format!("failed to bind {}", bind_addr))?
    .run()
    .await
    .context("server error")
}
