//! Shapes rows returned by the POI procedures into a GeoJSON `FeatureCollection` the map can
//! render directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Style values used when neither a POI row nor its map's defaults set one.
#[derive(Deserialize, Serialize, Clone, PartialEq, Debug)]
pub struct StyleFallbacks {
    /// The pin color.
    pub color: String,

    /// The icon scale.
    pub icon_size: f64,
}

impl StyleFallbacks {
    /// The fallback pin color.
    pub const DEFAULT_COLOR: &'static str = "rgba(0, 0, 0, 1)";

    /// The fallback icon scale.
    pub const DEFAULT_ICON_SIZE: f64 = 0.9;
}

impl Default for StyleFallbacks {
    fn default() -> Self {
        Self {
            color: Self::DEFAULT_COLOR.into(),
            icon_size: Self::DEFAULT_ICON_SIZE,
        }
    }
}

/// Per-map style defaults, each of which may be unset.
#[derive(Deserialize, Serialize, Clone, PartialEq, Default, Debug)]
pub struct MapDefaults {
    /// The default pin color.
    pub color: Option<String>,

    /// The default logo drawn inside each pin.
    pub icon_url: Option<String>,

    /// The default icon scale.
    pub icon_size: Option<f64>,
}

impl MapDefaults {
    /// Clears values that are set but empty, so they don't shadow the fallbacks.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            color: self.color.filter(|color| !color.is_empty()),
            icon_url: self.icon_url.filter(|url| !url.is_empty()),
            icon_size: self.icon_size.filter(|size| size.is_normal()),
        }
    }
}

/// One row from `pois_in_bbox` or `pois_nearby`. Every field but `id` may be missing.
#[derive(Deserialize, Clone, PartialEq, Default, Debug)]
#[serde(default)]
pub struct PoiRow {
    /// The POI's ID, passed through as-is (numeric or string).
    pub id: Value,

    /// The display name.
    pub title: Option<String>,

    /// A page with more about the POI.
    pub link_url: Option<String>,

    /// Where the POI was imported from.
    pub source_type: Option<String>,

    /// The street address.
    pub address: Option<String>,

    /// Free-form labels the tag filter matches against.
    pub tags: Option<Vec<String>>,

    /// The POI's category.
    pub category: Option<String>,

    /// Distance from the query point in meters. Only radius queries return this.
    pub distance_m: Option<f64>,

    /// The longitude.
    pub lon: Option<f64>,

    /// The latitude.
    pub lat: Option<f64>,

    /// A pre-built GeoJSON geometry, for procedures that return one instead of `lon`/`lat`.
    pub geojson: Option<Value>,

    /// A marker color overriding the map's default.
    pub color: Option<String>,

    /// A marker icon overriding the map's default.
    pub icon_url: Option<String>,

    /// A marker scale overriding the map's default.
    pub icon_size: Option<f64>,
}

/// A GeoJSON `FeatureCollection`.
#[derive(Serialize, Clone, PartialEq, Default, Debug)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    /// The features, in the same order as the rows they came from.
    pub features: Vec<Feature>,
}

/// A GeoJSON `Feature` for one POI.
#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(tag = "type")]
pub struct Feature {
    /// The POI's ID.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub id: Value,

    /// Where the POI is, or `null` if the row had no location.
    pub geometry: Option<Geometry>,

    /// Descriptive and styling properties.
    pub properties: Properties,
}

/// A feature's geometry.
#[derive(Serialize, Clone, PartialEq, Debug)]
#[serde(untagged)]
pub enum Geometry {
    /// A point built from a row's coordinates.
    Point(Point),

    /// A geometry object supplied by the backend verbatim.
    Raw(Value),
}

/// A GeoJSON `Point`.
#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
#[serde(tag = "type")]
pub struct Point {
    /// `[longitude, latitude]`.
    pub coordinates: [f64; 2],
}

/// The `properties` member of a POI [`Feature`].
#[derive(Serialize, Clone, PartialEq, Debug)]
pub struct Properties {
    /// The POI's ID, duplicated here since map libraries don't expose a feature's top-level ID
    /// to style expressions.
    pub id: Value,

    /// See [`PoiRow::title`].
    pub title: Option<String>,

    /// See [`PoiRow::link_url`].
    pub link_url: Option<String>,

    /// See [`PoiRow::source_type`].
    pub source_type: Option<String>,

    /// See [`PoiRow::address`].
    pub address: Option<String>,

    /// See [`PoiRow::tags`].
    pub tags: Option<Vec<String>>,

    /// See [`PoiRow::category`].
    pub category: Option<String>,

    /// See [`PoiRow::distance_m`]. Omitted for bounding box queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,

    /// The resolved marker color.
    pub color: String,

    /// The resolved marker icon, or `null` to draw a plain circle.
    pub icon_url: Option<String>,

    /// The resolved marker scale.
    pub icon_size: f64,
}

/// Converts rows into a [`FeatureCollection`], resolving each style property from the row first,
/// then the map's defaults, then the fallbacks.
pub fn rows_to_feature_collection(
    rows: Vec<PoiRow>,
    defaults: &MapDefaults,
    fallbacks: &StyleFallbacks,
) -> FeatureCollection {
    FeatureCollection {
        features: rows
            .into_iter()
            .map(|row| row_to_feature(row, defaults, fallbacks))
            .collect(),
    }
}

/// Converts one row into a [`Feature`].
fn row_to_feature(row: PoiRow, defaults: &MapDefaults, fallbacks: &StyleFallbacks) -> Feature {
    let geometry = match (row.geojson, row.lon, row.lat) {
        (Some(geojson), _, _) if !geojson.is_null() => Some(Geometry::Raw(geojson)),
        (_, Some(lon), Some(lat)) => Some(Geometry::Point(Point {
            coordinates: [lon, lat],
        })),
        _ => None,
    };

    let color = non_empty(row.color)
        .or_else(|| non_empty(defaults.color.clone()))
        .unwrap_or_else(|| fallbacks.color.clone());

    let icon_url = non_empty(row.icon_url).or_else(|| non_empty(defaults.icon_url.clone()));

    let icon_size = row
        .icon_size
        .filter(|size| size.is_normal())
        .or(defaults.icon_size.filter(|size| size.is_normal()))
        .unwrap_or(fallbacks.icon_size);

    Feature {
        id: row.id.clone(),
        geometry,
        properties: Properties {
            id: row.id,
            title: row.title,
            link_url: row.link_url,
            source_type: row.source_type,
            address: row.address,
            tags: row.tags,
            category: row.category,
            distance_m: row.distance_m,
            color,
            icon_url,
            icon_size,
        },
    }
}

/// Treats an empty string the same as an unset one.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}
