//! POIs of a map inside a bounding box.

use axum::extract::State;
use axum_macros::debug_handler;
use serde::Deserialize;

use crate::{
    api::{
        self,
        validation::{parse_field, parse_tags, required, required_slug, BoundingBox},
        CachedResponse, Query,
    },
    geojson::{rows_to_feature_collection, FeatureCollection},
    AppState,
};

pub mod nearby;

/// A `GET` request query for this API route.
#[derive(Deserialize, Debug)]
pub struct GetQuery {
    /// The map's slug.
    pub map: Option<String>,

    /// `minLon,minLat,maxLon,maxLat`.
    pub bbox: Option<String>,

    /// A comma-separated tag filter.
    pub tags: Option<String>,
}

/// Returns a map's POIs inside a bounding box as a GeoJSON `FeatureCollection`, styled with the
/// map's defaults.
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
    let bbox: BoundingBox = parse_field("bbox", &required("bbox", query.bbox)?)?;
    let tags = parse_tags(query.tags.as_deref());

    let defaults = state.backend.fetch_map_defaults(&map).await?;
    let rows = state
        .backend
        .pois_in_bbox(&map, &bbox, tags.as_deref())
        .await?;

    tracing::debug!(map = %map, rows = rows.len(), "fetched POIs in bounding box");

    api::cached(rows_to_feature_collection(
        rows,
        &defaults,
        &state.config.fallbacks,
    ))
}
