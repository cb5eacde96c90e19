use std::fs::OpenOptions;

use actix_web::{web, App, HttpServer};
use sea_orm::Database;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{filter, fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::auth::Authority;

mod config;
mod consts;
mod utils;

mod entity;
mod period;
mod reconcile;
mod auth;
mod pages;

#[actix_web::main]
async fn main() {
    let _ = dotenvy::dotenv();
    
    let log_file = OpenOptions::new()
        .append(true)
        .create(true)
        .open("trace.log")
        .expect("Unable to open `trace.log`");
    
    let subscriber = Registry::default()
        .with(
            fmt::layer()
                .with_ansi(true)
                .with_line_number(true)
                .with_filter(EnvFilter::from_default_env())
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(log_file)
                .with_filter(filter::LevelFilter::from_level(Level::TRACE))
        );
    
    tracing::subscriber::set_global_default(subscriber).expect("Unable to install tracing subscriber");
    
    let config::Config {
        host_address,
        database_opt,
        jwt_key,
        call_timeout,
    } = config::load();
    
    let database = web::Data::new(Database::connect(database_opt).await.expect("Unable to connect to database"));
    let authority = web::Data::new(Authority::new(jwt_key.as_bytes()));
    let call_timeout = web::Data::new(call_timeout);

    info!(%host_address, timeout_secs = call_timeout.0.as_secs(), "starting payroll service");

    let server = HttpServer::new(move || {
        App::new()
            .app_data(database.clone())
            .app_data(authority.clone())
            .app_data(call_timeout.clone())
            .wrap(TracingLogger::default())
            .configure(pages::config)
    });
    
    server
        .bind(host_address).expect("Unable to bind `HOST_ADDRESS`")
        .run().await.expect("Server stopped unexpectedly");
}
