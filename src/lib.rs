//! A read-only proxy between a browser map and the hosted data service holding its points of
//! interest. It validates viewport queries, forwards them to the service's stored procedures, and
//! returns the resulting rows as styled GeoJSON.

pub mod api;
pub mod backend;
pub mod config;
pub mod geojson;
pub(crate) mod percent_encoding;

use std::sync::Arc;

use axum::{http::Method, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{backend::BackendClient, config::Config};

/// State shared by every request handler. It's immutable, so requests never coordinate.
#[derive(Clone, Debug)]
pub struct AppState {
    /// The loaded configuration.
    pub config: Arc<Config>,

    /// The data service client.
    pub backend: BackendClient,
}

impl AppState {
    /// Builds the state from the configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client can't be initialized.
    pub fn new(config: Config) -> Result<Self, reqwest::Error> {
        Ok(Self {
            backend: BackendClient::new(&config.backend)?,
            config: Arc::new(config),
        })
    }
}

/// Builds the complete application: the API router with request tracing and CORS for the
/// browser map.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_origin(Any);

    api::router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
