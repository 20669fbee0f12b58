//! An HTTP resource representing a single map's metadata.

use axum::{extract::State, http::StatusCode};
use axum_macros::debug_handler;
use serde::Serialize;

use crate::{
    api::{self, validation::required_slug, Json, Path, Response},
    backend::MapRecord,
    AppState,
};

pub mod view;

/// Looks up a map by slug.
///
/// # Errors
///
/// Returns [`api::Error::MapNotFound`] if no map has the slug, or [`api::Error::MapLookup`] if the
/// lookup itself fails.
async fn find_map(state: &AppState, slug: String) -> Result<MapRecord, api::Error> {
    let slug = required_slug("slug", Some(slug))?;

    state
        .backend
        .fetch_map(&slug)
        .await
        .map_err(api::Error::MapLookup)?
        .ok_or_else(|| api::Error::MapNotFound(slug.into_inner()))
}

/// Gets a map's metadata.
///
/// # Errors
///
/// See [`crate::api::Error`].
#[debug_handler]
pub async fn get(State(state): State<AppState>, Path(slug): Path<String>) -> Response<GetResponse> {
    let map = find_map(&state, slug).await?;

    Ok((StatusCode::OK, Json(GetResponse { ok: true, map })))
}

/// A `GET` response body for this API route.
#[derive(Serialize, Debug)]
pub struct GetResponse {
    /// Always `true`.
    pub ok: bool,

    /// The map's row, with exactly the columns the lookup selects.
    pub map: MapRecord,
}
