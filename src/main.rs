//! # Diamond Raffle Webhook Service
//!
//! Receives Shopify `orders/paid` webhooks and keeps the count of raffle
//! diamonds sold on a counter product, once per order.
//! Configures logging, SSL and route handling.

pub mod api;
pub mod config;
pub mod consts;
pub mod metric;
pub mod services;
pub mod webhook;

use anyhow::Context;
use logfire::config::{MetricsOptions, SendToLogfire};
use ntex::web;
use openssl::ssl::{SslAcceptor, SslFiletype, SslMethod};

#[ntex::main]
async fn main() -> anyhow::Result<()> {
    // Initialize configuration
    config::init_config()?;

    let app_config = config::APP_CONFIG
        .get()
        .context("failed to get app config")?;

    // Initialize logging and metrics, exported only when a token is configured
    let mut logfire_config = logfire::configure()
        .install_panic_handler()
        .with_metrics(Some(MetricsOptions::default()))
        .send_to_logfire(SendToLogfire::IfTokenPresent);
    if let Some(token) = &app_config.logfire_token {
        logfire_config = logfire_config.with_token(token.clone());
    }
    let shutdown_handler = logfire_config.finish()?;

    logfire::info!(
        "Counting diamonds on product {handle} up to {max}",
        handle = app_config.counter_product_handle.clone(),
        max = app_config.counter_max as i64
    );

    configure_and_run_server(app_config).await?;

    shutdown_handler.shutdown()?;

    Ok(())
}

/// Configures SSL acceptor for production environments
fn setup_ssl_acceptor(
    app_config: &config::AppConfig,
) -> anyhow::Result<openssl::ssl::SslAcceptorBuilder> {
    let mut ssl_acceptor = SslAcceptor::mozilla_intermediate(SslMethod::tls_server())
        .map_err(|e| anyhow::anyhow!("Failed to create SSL acceptor: {}", e))?;

    ssl_acceptor
        .set_private_key_file(&app_config.private_key_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load private key from {}: {}",
                app_config.private_key_path,
                e
            )
        })?;

    ssl_acceptor
        .set_certificate_file(&app_config.certificate_path, SslFiletype::PEM)
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to load certificate from {}: {}",
                app_config.certificate_path,
                e
            )
        })?;

    Ok(ssl_acceptor)
}

/// Creates application state from the configuration
fn create_app_state(app_config: &config::AppConfig) -> webhook::AppState {
    webhook::AppState {
        settings: app_config.webhook_settings(),
        credentials: Box::new(services::shopify::ClientCredentialsProvider::new(app_config)),
        store: Box::new(services::shopify::ShopifyClient::new(app_config)),
    }
}

/// Configures and starts the web server with appropriate SSL settings
async fn configure_and_run_server(app_config: &'static config::AppConfig) -> anyhow::Result<()> {
    let server_addr = ("0.0.0.0", app_config.web_server_port);

    let server = web::server(move || {
        web::App::new()
            // no query string in access logs, it carries the webhook key
            .wrap(web::middleware::Logger::new("%a \"%U\" %s %b %T"))
            .state(create_app_state(app_config))
            .configure(webhook::routes::shopify)
    });

    let bound_server = if app_config.is_prod() {
        let ssl_acceptor = setup_ssl_acceptor(app_config)?;
        server.bind_openssl(server_addr, ssl_acceptor)?
    } else {
        server.bind(server_addr)?
    };

    bound_server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
