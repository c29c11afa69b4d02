#[macro_use]
extern crate rocket;

use std::sync::Arc;

use mongodb::Client;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::billing::{DisabledGateway, PaymentGateway};
use crate::config::Config;
use crate::error::BackendError;
use crate::live::hub::ChatHub;
use crate::mail::{LogMailer, Mailer, SmtpMailer};
use crate::route::mount_api;
use crate::security::Security;

pub mod billing;
pub mod config;
pub mod data;
pub mod error;
pub mod live;
pub mod mail;
pub mod middleware;
pub mod resp;
pub mod role;
pub mod route;
pub mod security;
pub mod util;

pub async fn create(log_level: Option<Level>) -> Result<Rocket<Build>, BackendError> {
    if let Some(level) = log_level {
        let subscriber = FmtSubscriber::builder().with_max_level(level).finish();

        if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
            eprintln!("Unable to set global logger: {}", err);
        }
    }

    tracing::info!("Reading .env file...");
    if dotenv::dotenv().is_err() {
        tracing::warn!("Unable to load .env file.");
    }

    tracing::info!("Loading configuration...");
    let config = Config::from_env()?;
    let security = Security::from_config(&config);

    tracing::info!("Connecting to MongoDB: {}", config.mongodb_uri);
    let client = Client::with_uri_str(config.mongodb_uri.as_str()).await?;

    tracing::info!("Using MongoDB database: {}", config.mongodb_db);
    let db = client.database(config.mongodb_db.as_str());
    db.list_collections(None, None).await?;

    let mailer: Box<dyn Mailer> = match config.smtp.clone() {
        Some(smtp) => Box::new(SmtpMailer::new(smtp)),
        None => {
            tracing::warn!("SMTP not configured; mail goes to the log.");
            Box::new(LogMailer)
        }
    };

    // No provider integration is wired in yet; paid signups are refused
    // until one replaces this.
    let gateway: Box<dyn PaymentGateway> = Box::new(DisabledGateway);

    tracing::info!("Setting up CORS...");
    let cors = rocket_cors::CorsOptions {
        allowed_origins: AllowedOrigins::All,
        allowed_methods: vec![Method::Get, Method::Put, Method::Post, Method::Delete]
            .into_iter()
            .map(From::from)
            .collect(),
        allowed_headers: AllowedHeaders::All,
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()
    .map_err(|e| BackendError::Cors(e.to_string()))?;

    tracing::info!("Starting HTTP server...");
    let mut rocket = rocket::build()
        .manage(config)
        .manage(security)
        .manage(db)
        .manage(Arc::new(ChatHub::new()))
        .manage(mailer)
        .manage(gateway)
        .attach(cors);
    rocket = mount_api(rocket);

    Ok(rocket)
}
