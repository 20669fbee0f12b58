//! A client for the hosted data service, which exposes its tables and stored procedures through a
//! PostgREST API under `/rest/v1/`.

mod network;

use std::sync::Arc;

use percent_encoding::utf8_percent_encode;
use reqwest::{RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use network::NetworkErrorCause;

use crate::{
    api::validation::BoundingBox,
    config::BackendConfig,
    geojson::{MapDefaults, PoiRow},
    percent_encoding::COMPONENT,
};

/// The columns of `maps` exposed by the map lookup.
const MAP_COLUMNS: &str =
    "slug,title,poi_icon_url,poi_color,poi_icon_size,center_lon,center_lat,zoom,style_url,language";

/// The columns of `maps` holding POI style defaults.
const MAP_DEFAULTS_COLUMNS: &str = "poi_color,poi_icon_url,poi_icon_size";

/// A stored procedure this client may call.
#[derive(AsRefStr, Display, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[strum(serialize_all = "snake_case")]
pub enum RpcFunction {
    /// Returns a map's POIs inside a bounding box.
    PoisInBbox,

    /// Returns a map's POIs within a radius of a point, with their distances.
    PoisNearby,
}

/// An error calling the data service.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The data service responded with a non-success status.
    #[error("{target} returned {status}: {body}")]
    RemoteCall {
        /// The procedure or table that was called.
        target: String,

        /// The response status.
        status: StatusCode,

        /// The response body text, for diagnosis.
        body: String,
    },

    /// The data service responded with a success status, but the body wasn't the expected rows.
    #[error("{target} returned an unexpected body: {source}")]
    InvalidResponse {
        /// The procedure or table that was called.
        target: String,

        /// The response status.
        status: StatusCode,

        /// The response body text, for diagnosis.
        body: String,

        /// Why the body couldn't be parsed.
        source: serde_json::Error,
    },

    /// The request couldn't be sent, or its response couldn't be received.
    #[error("request to the data service failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A row of the `maps` table.
#[derive(Deserialize, Serialize, Clone, PartialEq, Debug)]
pub struct MapRecord {
    /// The map's unique, URL-safe identifier.
    pub slug: String,

    /// The display name.
    pub title: Option<String>,

    /// See [`MapDefaults::icon_url`].
    pub poi_icon_url: Option<String>,

    /// See [`MapDefaults::color`].
    pub poi_color: Option<String>,

    /// See [`MapDefaults::icon_size`].
    pub poi_icon_size: Option<f64>,

    /// The initial center's longitude.
    pub center_lon: Option<f64>,

    /// The initial center's latitude.
    pub center_lat: Option<f64>,

    /// The initial zoom level.
    pub zoom: Option<f64>,

    /// A base map style overriding the configured one.
    pub style_url: Option<String>,

    /// The base map's label language.
    pub language: Option<String>,
}

/// The style default columns of a `maps` row.
#[derive(Deserialize, Debug)]
struct MapDefaultsRow {
    /// See [`MapDefaults::color`].
    poi_color: Option<String>,

    /// See [`MapDefaults::icon_url`].
    poi_icon_url: Option<String>,

    /// See [`MapDefaults::icon_size`].
    poi_icon_size: Option<f64>,
}

/// The payload for [`RpcFunction::PoisInBbox`].
#[derive(Serialize, Debug)]
struct PoisInBboxPayload<'a> {
    /// The map to search.
    p_map_slug: &'a str,

    /// See [`BoundingBox::min_lon`].
    p_min_lon: f64,

    /// See [`BoundingBox::min_lat`].
    p_min_lat: f64,

    /// See [`BoundingBox::max_lon`].
    p_max_lon: f64,

    /// See [`BoundingBox::max_lat`].
    p_max_lat: f64,

    /// The tag filter. Serialized as `null` rather than omitted when there's no filter.
    p_tags: Option<&'a [String]>,
}

/// The payload for [`RpcFunction::PoisNearby`].
#[derive(Serialize, Debug)]
struct PoisNearbyPayload<'a> {
    /// The map to search.
    p_map_slug: &'a str,

    /// The center's longitude.
    p_lon: f64,

    /// The center's latitude.
    p_lat: f64,

    /// The search radius in meters.
    p_radius_m: f64,

    /// See [`PoisInBboxPayload::p_tags`].
    p_tags: Option<&'a [String]>,
}

/// An authenticated handle to the data service. Cloning is cheap and shares the connection pool.
#[derive(Clone, Debug)]
pub struct BackendClient {
    /// The underlying HTTP client.
    http: reqwest::Client,

    /// The project's base URL, without a trailing slash.
    base_url: Arc<str>,

    /// The anonymous API key.
    anon_key: Arc<str>,
}

impl BackendClient {
    /// Constructs a client from its configuration.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client can't be initialized (for example, if TLS is unavailable).
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.url.as_str().into(),
            anon_key: config.anon_key.as_str().into(),
        })
    }

    /// Attaches the API key both as the `apikey` header and as a bearer credential.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &*self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    /// Calls a stored procedure and returns its rows in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteCall`] on a non-success status, [`Error::InvalidResponse`] if the
    /// body isn't an array of rows, or [`Error::Transport`] if the call couldn't be completed.
    pub async fn call_rpc<P, R>(&self, function: RpcFunction, payload: &P) -> Result<Vec<R>, Error>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/rest/v1/rpc/{function}", self.base_url);

        tracing::debug!(%function, "calling procedure");

        let request = self.authorized(self.http.post(url).json(payload));

        read_rows(function.as_ref(), request).await
    }

    /// Returns a map's POIs inside a bounding box, optionally filtered by tags.
    ///
    /// # Errors
    ///
    /// See [`Self::call_rpc`].
    pub async fn pois_in_bbox(
        &self,
        map_slug: &str,
        bbox: &BoundingBox,
        tags: Option<&[String]>,
    ) -> Result<Vec<PoiRow>, Error> {
        let payload = PoisInBboxPayload {
            p_map_slug: map_slug,
            p_min_lon: bbox.min_lon,
            p_min_lat: bbox.min_lat,
            p_max_lon: bbox.max_lon,
            p_max_lat: bbox.max_lat,
            p_tags: tags,
        };

        self.call_rpc(RpcFunction::PoisInBbox, &payload).await
    }

    /// Returns a map's POIs within `radius_m` meters of a point, optionally filtered by tags.
    ///
    /// # Errors
    ///
    /// See [`Self::call_rpc`].
    pub async fn pois_nearby(
        &self,
        map_slug: &str,
        (lon, lat): (f64, f64),
        radius_m: f64,
        tags: Option<&[String]>,
    ) -> Result<Vec<PoiRow>, Error> {
        let payload = PoisNearbyPayload {
            p_map_slug: map_slug,
            p_lon: lon,
            p_lat: lat,
            p_radius_m: radius_m,
            p_tags: tags,
        };

        self.call_rpc(RpcFunction::PoisNearby, &payload).await
    }

    /// Reads at most one row of a table whose `slug` column equals `slug`.
    async fn select_by_slug<R: DeserializeOwned>(
        &self,
        table: &str,
        slug: &str,
        columns: &str,
    ) -> Result<Option<R>, Error> {
        let url = format!(
            "{}/rest/v1/{table}?slug=eq.{}&select={columns}&limit=1",
            self.base_url,
            utf8_percent_encode(slug, COMPONENT),
        );

        let request = self.authorized(self.http.get(url));
        let rows: Vec<R> = read_rows(table, request).await?;

        Ok(rows.into_iter().next())
    }

    /// Gets a map's POI style defaults.
    ///
    /// Missing map metadata mustn't stop POIs from rendering, so a non-success status, an
    /// unreadable body or a missing map yields empty defaults instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the data service can't be reached.
    pub async fn fetch_map_defaults(&self, slug: &str) -> Result<MapDefaults, Error> {
        match self
            .select_by_slug::<MapDefaultsRow>("maps", slug, MAP_DEFAULTS_COLUMNS)
            .await
        {
            Ok(Some(row)) => Ok(MapDefaults {
                color: row.poi_color,
                icon_url: row.poi_icon_url,
                icon_size: row.poi_icon_size,
            }
            .normalized()),
            Ok(None) => {
                tracing::debug!(slug, "no map defaults found");
                Ok(MapDefaults::default())
            }
            Err(Error::RemoteCall { status, body, .. }) => {
                tracing::warn!(slug, %status, %body, "map defaults lookup failed; using fallbacks");
                Ok(MapDefaults::default())
            }
            Err(Error::InvalidResponse { source, body, .. }) => {
                tracing::warn!(
                    slug,
                    %source,
                    %body,
                    "map defaults were unreadable; using fallbacks"
                );
                Ok(MapDefaults::default())
            }
            Err(error) => Err(error),
        }
    }

    /// Gets a map's metadata, or `None` if no map has this slug.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RemoteCall`] on a non-success status, [`Error::InvalidResponse`] if the
    /// body isn't an array of rows, or [`Error::Transport`] if the request fails.
    pub async fn fetch_map(&self, slug: &str) -> Result<Option<MapRecord>, Error> {
        self.select_by_slug("maps", slug, MAP_COLUMNS).await
    }

    /// Checks whether the data service is reachable, returning whatever status it responds with.
    ///
    /// # Errors
    ///
    /// Returns the transport error if no response was received.
    pub async fn ping(&self) -> Result<StatusCode, reqwest::Error> {
        let url = format!("{}/rest/v1/", self.base_url);

        let response = self.authorized(self.http.get(url)).send().await?;

        Ok(response.status())
    }
}

/// Sends a request and parses its response body as an array of rows.
async fn read_rows<R: DeserializeOwned>(
    target: &str,
    request: RequestBuilder,
) -> Result<Vec<R>, Error> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        // The status is what matters here, so an unreadable body is reported as empty.
        let body = response.text().await.unwrap_or_default();

        return Err(Error::RemoteCall {
            target: target.into(),
            status,
            body,
        });
    }

    let body = response.text().await?;

    match serde_json::from_str(&body) {
        Ok(rows) => Ok(rows),
        Err(source) => Err(Error::InvalidResponse {
            target: target.into(),
            status,
            body,
            source,
        }),
    }
}
