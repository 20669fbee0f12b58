//! Reachability of the data service.

use axum::{extract::State, http::StatusCode};
use axum_macros::debug_handler;
use serde::Serialize;

use crate::{
    api::{self, Json, Response},
    backend::NetworkErrorCause,
    AppState,
};

/// Checks that the data service responds. Any HTTP status counts as reachable; only a transport
/// failure is an error, reported with its low-level cause.
///
/// # Errors
///
/// Returns [`api::Error::Unreachable`] if no response was received.
#[debug_handler]
pub async fn get(State(state): State<AppState>) -> Response<GetResponse> {
    match state.backend.ping().await {
        Ok(status) => Ok((
            StatusCode::OK,
            Json(GetResponse {
                ok: true,
                status: status.as_u16(),
            }),
        )),
        Err(error) => Err(api::Error::Unreachable {
            cause: NetworkErrorCause::from_reqwest(&error),
            message: error.to_string(),
        }),
    }
}

/// A `GET` response body for this API route.
#[derive(Serialize, Debug)]
pub struct GetResponse {
    /// Always `true`.
    pub ok: bool,

    /// The status the data service responded with.
    pub status: u16,
}
