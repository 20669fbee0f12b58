//! All routes for the HTTP API.

use axum::{
    handler::Handler,
    http::Uri,
    routing::{get, MethodRouter},
    Router,
};

use crate::{api, AppState};

pub mod health;
pub mod maps;
pub mod pois;

/// Builds the API router. Requests that match no route, including requests to a known path with
/// a method other than `GET`, get a JSON `route_not_found` error.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/pois", get_only(pois::get))
        .route("/api/pois/nearby", get_only(pois::nearby::get))
        .route("/api/pois/health", get_only(health::get))
        .route("/api/maps/:slug", get_only(maps::get))
        .route("/api/maps/:slug/view", get_only(maps::view::get))
        .fallback(route_not_found)
}

/// Routes `GET` (and `HEAD`) requests to `handler`, and any other method to [`route_not_found`].
fn get_only<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    get(handler).fallback(route_not_found)
}

/// The fallback handler for unmatched requests.
#[expect(clippy::unused_async, reason = "Axum route handlers must be async")]
async fn route_not_found(uri: Uri) -> api::Error {
    api::Error::RouteNotFound {
        path: uri.path().into(),
    }
}
