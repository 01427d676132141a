#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use std::net::SocketAddr;

use anyhow::Result;
use axum::Extension;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower::Layer;
use tower_http::normalize_path::NormalizePath;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;

use crate::api::JwtKeys;
use crate::api::router;
use crate::storage::Memory;
use crate::storage::Postgres;
use crate::storage::Storage;
use crate::users::ensure_initial_user;
use crate::utils::env_var;
use crate::utils::env_var_or_else;

mod api;
mod choices;
mod comments;
mod graceful_shutdown;
mod notes;
mod pages;
mod password;
mod storage;
#[cfg(test)]
mod tests;
mod users;
mod utils;

const DEFAULT_RUST_LOG: &str = "note_todo=debug,tower_http=debug";
const DEFAULT_ADDRESS: &str = "0.0.0.0:6000";

/// The app, trailing slashes are removed before routing
pub type App = NormalizePath<Router>;

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let app = if let Some(database_url) = env_var("DATABASE_URL") {
        tracing::info!("Using Postgres storage");

        setup_app(Postgres::connect(&database_url).await?).await?
    } else {
        tracing::info!("`DATABASE_URL` not set, using memory storage");

        setup_app(Memory::new()).await?
    };

    let address = setup_address()?;
    tracing::info!("Listening on {}", address);

    let listener = TcpListener::bind(address).await?;

    axum::serve(
        listener,
        axum::ServiceExt::<axum::extract::Request>::into_make_service(app),
    )
    .with_graceful_shutdown(graceful_shutdown::shutdown_signal())
    .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// # Errors
///
/// Will return `Err` if any of its dependencies fail to load:
/// - Initial user setup
pub async fn setup_app<S: Storage>(storage: S) -> Result<App> {
    ensure_initial_user(&storage).await?;

    Ok(create_app(storage))
}

/// Create the router for the notes app
fn create_app<S: Storage>(storage: S) -> App {
    let jwt_keys = setup_jwt_keys();

    let router = Router::new()
        .nest("/api", router::<S>())
        .route("/login", get(pages::login_page).post(pages::login))
        .route("/about", get(pages::about::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(storage))
        .layer(Extension(jwt_keys));

    NormalizePathLayer::trim_trailing_slash().layer(router)
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(
            env_var("RUST_LOG").unwrap_or_else(|| DEFAULT_RUST_LOG.into()),
        ))
        .with(fmt::layer())
        .init();
}

fn setup_jwt_keys() -> JwtKeys {
    use crate::password::generate;

    let jwt_secret = env_var_or_else("JWT_SECRET", || {
        let jwt_secret = generate();
        tracing::info!("`JWT_SECRET` is not set, generating temporary one: {jwt_secret}");
        jwt_secret
    });

    JwtKeys::new(jwt_secret.as_bytes())
}

fn setup_address() -> Result<SocketAddr> {
    let mut address =
        env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

    // optional override of just the port
    if let Some(port) = env_var("PORT") {
        let port = port.parse::<u16>()?;

        address.set_port(port);
    }

    Ok(address)
}
