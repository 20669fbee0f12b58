//! The initial viewport a map page opens with.

use axum::{extract::State, http::StatusCode};
use axum_macros::debug_handler;
use serde::Serialize;

use crate::{
    api::{Json, Path, Response},
    backend::MapRecord,
    config::MapStyle,
    AppState,
};

/// The center used when a map doesn't set one (central Tokyo), as `(lon, lat)`.
const DEFAULT_CENTER: (f64, f64) = (139.719, 35.681);

/// The zoom level used when a map doesn't set one.
const DEFAULT_ZOOM: f64 = 12.0;

/// The label language used when a map doesn't set one.
const DEFAULT_LANGUAGE: &str = "ja";

/// Where and how a map page starts.
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct InitialView {
    /// The center's longitude.
    pub lng: f64,

    /// The center's latitude.
    pub lat: f64,

    /// The zoom level.
    pub zoom: f64,

    /// The base map style, including its key.
    pub style_url: String,

    /// The label language.
    pub language: String,
}

impl InitialView {
    /// Resolves a map's initial view, filling anything the map leaves unset from the defaults.
    pub fn resolve(map: &MapRecord, default_style: &MapStyle) -> Self {
        Self {
            lng: map.center_lon.unwrap_or(DEFAULT_CENTER.0),
            lat: map.center_lat.unwrap_or(DEFAULT_CENTER.1),
            zoom: map.zoom.unwrap_or(DEFAULT_ZOOM),
            style_url: map
                .style_url
                .clone()
                .unwrap_or_else(|| default_style.style_url()),
            language: map
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.into()),
        }
    }
}

/// Gets the initial view for a map's page.
///
/// # Errors
///
/// See [`crate::api::Error`].
#[debug_handler]
pub async fn get(State(state): State<AppState>, Path(slug): Path<String>) -> Response<GetResponse> {
    let map = super::find_map(&state, slug).await?;
    let view = InitialView::resolve(&map, &state.config.map_style);

    Ok((StatusCode::OK, Json(GetResponse { ok: true, view })))
}

/// A `GET` response body for this API route.
#[derive(Serialize, Debug)]
pub struct GetResponse {
    /// Always `true`.
    pub ok: bool,

    /// The resolved view.
    pub view: InitialView,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_map() -> MapRecord {
        MapRecord {
            slug: "demo-tokyo".into(),
            title: None,
            poi_icon_url: None,
            poi_color: None,
            poi_icon_size: None,
            center_lon: None,
            center_lat: None,
            zoom: None,
            style_url: None,
            language: None,
        }
    }

    #[test]
    fn unset_values_use_defaults() {
        let style = MapStyle {
            url: "https://tiles.example.com/style.json".into(),
            key: "k".into(),
        };

        assert_eq!(
            InitialView::resolve(&bare_map(), &style),
            InitialView {
                lng: 139.719,
                lat: 35.681,
                zoom: 12.0,
                style_url: "https://tiles.example.com/style.json?key=k".into(),
                language: "ja".into(),
            }
        );
    }

    #[test]
    fn map_values_win() {
        let map = MapRecord {
            center_lon: Some(2.35),
            center_lat: Some(48.85),
            zoom: Some(9.5),
            style_url: Some("https://custom.example.com/style.json".into()),
            language: Some("fr".into()),
            ..bare_map()
        };

        let view = InitialView::resolve(
            &map,
            &MapStyle {
                url: String::new(),
                key: String::new(),
            },
        );

        assert_eq!(view.style_url, "https://custom.example.com/style.json");
        assert_eq!(view.language, "fr");
        assert_eq!((view.lng, view.lat, view.zoom), (2.35, 48.85, 9.5));
    }
}
