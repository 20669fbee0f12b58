//! POIs of a map around a point.

use axum::extract::State;
use axum_macros::debug_handler;
use serde::Deserialize;

use crate::{
    api::{
        self,
        validation::{invalid, parse_field, parse_tags, required, required_slug, Finite},
        CachedResponse, Query,
    },
    geojson::{rows_to_feature_collection, FeatureCollection},
    AppState,
};

/// The search radius in meters when none is given.
pub const DEFAULT_RADIUS_M: f64 = 2000.0;

/// A `GET` request query for this API route.
#[derive(Deserialize, Debug)]
pub struct GetQuery {
    /// The map's slug.
    pub map: Option<String>,

    /// The center's longitude.
    pub lon: Option<String>,

    /// The center's latitude.
    pub lat: Option<String>,

    /// The search radius in meters. An empty value counts as absent.
    pub radius: Option<String>,

    /// A comma-separated tag filter.
    pub tags: Option<String>,
}

/// Returns a map's POIs within a radius of a point as a GeoJSON `FeatureCollection`, each with
/// its distance from the point.
///
/// # Errors
///
/// See [`crate::api::Error`].
#[debug_handler]
pub async fn get(
    State(state): State<AppState>,
    Query(query): Query<GetQuery>,
) -> CachedResponse<FeatureCollection> {
    let map = required_slug("map", query.map)?;
    let lon: Finite = parse_field("lon", &required("lon", query.lon)?)?;
    let lat: Finite = parse_field("lat", &required("lat", query.lat)?)?;

    let radius_m = match query.radius.filter(|radius| !radius.is_empty()) {
        Some(radius) => parse_field::<Finite>("radius", &radius)?.get(),
        None => DEFAULT_RADIUS_M,
    };

    if radius_m < 0.0 {
        return Err(invalid("radius", "expected a non-negative number"));
    }

    let tags = parse_tags(query.tags.as_deref());

    let defaults = state.backend.fetch_map_defaults(&map).await?;
    let rows = state
        .backend
        .pois_nearby(&map, (lon.get(), lat.get()), radius_m, tags.as_deref())
        .await?;

    tracing::debug!(map = %map, radius_m, rows = rows.len(), "fetched nearby POIs");

    api::cached(rows_to_feature_collection(
        rows,
        &defaults,
        &state.config.fallbacks,
    ))
}
