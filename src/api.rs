//! The HTTP API the map frontend calls, exposed under `/api/`.

pub mod routes;
pub mod validation;

use axum::{
    extract::rejection::{PathRejection, QueryRejection},
    http::{header::CACHE_CONTROL, HeaderName, StatusCode},
    response::IntoResponse,
};
use axum_macros::FromRequestParts;
use serde::Serialize;
use serde_with::skip_serializing_none;
use thiserror::Error;

pub use axum::Json;
pub use routes::router;

use crate::backend::{self, NetworkErrorCause};

/// How long browsers and CDNs may reuse a POI response.
pub const POI_CACHE_CONTROL: &str = "public, max-age=15, stale-while-revalidate=60";

/// [`axum::extract::Query`] with rejections converted into the API's [`Error`] envelope.
#[derive(FromRequestParts, Debug)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct Query<T>(pub T);

/// [`axum::extract::Path`] with rejections converted into the API's [`Error`] envelope.
#[derive(FromRequestParts, Debug)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct Path<T>(pub T);

/// The result of an API route handler.
pub type Response<T> = Result<(StatusCode, Json<T>), Error>;

/// The result of an API route handler whose response carries caching headers.
pub type CachedResponse<T> = Result<(StatusCode, [(HeaderName, &'static str); 1], Json<T>), Error>;

/// Wraps a successful body with the POI caching policy.
pub(crate) fn cached<T>(body: T) -> CachedResponse<T> {
    Ok((
        StatusCode::OK,
        [(CACHE_CONTROL, POI_CACHE_CONTROL)],
        Json(body),
    ))
}

/// The category of an [`Error`], sent to clients as the envelope's `kind`.
#[derive(Serialize, Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request was malformed.
    Validation,

    /// The data service responded with a failure.
    Upstream,

    /// The data service couldn't be reached.
    Unreachable,

    /// The requested resource doesn't exist.
    NotFound,

    /// No route matches the request.
    RouteNotFound,
}

/// An API error. Every variant renders as the same JSON envelope:
/// `{ "ok": false, "kind": ..., "message": ..., ... }`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A required query parameter was missing or empty.
    #[error("missing required query parameter `{0}`")]
    MissingParam(&'static str),

    /// A parameter was present but malformed.
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParam {
        /// The parameter's name.
        field: &'static str,

        /// Why it was rejected.
        reason: String,
    },

    /// The query string couldn't be decoded.
    #[error(transparent)]
    Query(#[from] QueryRejection),

    /// The path parameters couldn't be decoded.
    #[error(transparent)]
    Path(#[from] PathRejection),

    /// No map has the requested slug.
    #[error("map `{0}` not found")]
    MapNotFound(String),

    /// No route matches the request.
    #[error("no match")]
    RouteNotFound {
        /// The requested path.
        path: String,
    },

    /// A call to the data service failed.
    #[error(transparent)]
    Backend(#[from] backend::Error),

    /// A map lookup failed. Unlike [`Error::Backend`], the upstream status is passed through.
    #[error(transparent)]
    MapLookup(backend::Error),

    /// The health check couldn't reach the data service.
    #[error("{message}")]
    Unreachable {
        /// The transport error's description.
        message: String,

        /// The low-level cause.
        cause: NetworkErrorCause,
    },
}

impl Error {
    /// Gets the error's category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingParam(_) | Self::InvalidParam { .. } | Self::Query(_) | Self::Path(_) => {
                ErrorKind::Validation
            }
            Self::MapNotFound(_) => ErrorKind::NotFound,
            Self::RouteNotFound { .. } => ErrorKind::RouteNotFound,
            Self::Backend(error) | Self::MapLookup(error) => match error {
                backend::Error::RemoteCall { .. } | backend::Error::InvalidResponse { .. } => {
                    ErrorKind::Upstream
                }
                backend::Error::Transport(_) => ErrorKind::Unreachable,
            },
            Self::Unreachable { .. } => ErrorKind::Unreachable,
        }
    }

    /// Gets the error's HTTP status code.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParam(_) | Self::InvalidParam { .. } | Self::Query(_) | Self::Path(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MapNotFound(_) | Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::MapLookup(backend::Error::RemoteCall { status, .. }) => *status,
            Self::Backend(_) | Self::MapLookup(_) | Self::Unreachable { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Gets the name of the parameter this error is about, if any.
    fn field(&self) -> Option<&'static str> {
        match self {
            Self::MissingParam(field) | Self::InvalidParam { field, .. } => Some(*field),
            _ => None,
        }
    }
}

/// The JSON body of an [`Error`] response.
#[skip_serializing_none]
#[derive(Serialize, Debug)]
struct ErrorBody<'a> {
    /// Always `false`, to match the `ok: true` of successful responses.
    ok: bool,

    /// See [`Error::kind`].
    kind: ErrorKind,

    /// The error's description.
    message: String,

    /// The offending parameter, for validation errors.
    field: Option<&'static str>,

    /// The unmatched path, for [`ErrorKind::RouteNotFound`].
    path: Option<&'a str>,

    /// The procedure or table that failed, for upstream errors.
    target: Option<&'a str>,

    /// The upstream response status, for upstream errors.
    status: Option<u16>,

    /// The upstream response body, for upstream errors.
    body: Option<&'a str>,

    /// The low-level network failure, for health checks.
    cause: Option<&'a NetworkErrorCause>,
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, kind = ?self.kind(), "request failed");
        } else {
            tracing::warn!(error = %self, kind = ?self.kind(), "request rejected");
        }

        let mut body = ErrorBody {
            ok: false,
            kind: self.kind(),
            message: self.to_string(),
            field: self.field(),
            path: None,
            target: None,
            status: None,
            body: None,
            cause: None,
        };

        match &self {
            Self::RouteNotFound { path } => body.path = Some(path.as_str()),
            Self::Backend(
                backend::Error::RemoteCall {
                    target,
                    status,
                    body: text,
                }
                | backend::Error::InvalidResponse {
                    target,
                    status,
                    body: text,
                    ..
                },
            )
            | Self::MapLookup(
                backend::Error::RemoteCall {
                    target,
                    status,
                    body: text,
                }
                | backend::Error::InvalidResponse {
                    target,
                    status,
                    body: text,
                    ..
                },
            ) => {
                body.target = Some(target.as_str());
                body.status = Some(status.as_u16());
                body.body = Some(text.as_str());
            }
            Self::Unreachable { cause, .. } => body.cause = Some(cause),
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::{json, Value};

    use super::*;

    async fn render(error: Error) -> anyhow::Result<(StatusCode, Value)> {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;

        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn validation_errors_name_the_field() -> anyhow::Result<()> {
        let (status, body) = render(Error::MissingParam("bbox")).await?;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({
                "ok": false,
                "kind": "validation",
                "message": "missing required query parameter `bbox`",
                "field": "bbox",
            })
        );

        Ok(())
    }

    #[tokio::test]
    async fn upstream_status_passes_through_only_for_map_lookups() -> anyhow::Result<()> {
        let remote_call = || backend::Error::RemoteCall {
            target: "maps".into(),
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "down".into(),
        };

        let (status, body) = render(Error::MapLookup(remote_call())).await?;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["kind"], "upstream");
        assert_eq!(body["status"], 503);
        assert_eq!(body["body"], "down");

        let (status, body) = render(Error::Backend(remote_call())).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["target"], "maps");

        Ok(())
    }

    #[tokio::test]
    async fn unreadable_bodies_are_upstream_errors() -> anyhow::Result<()> {
        let source = serde_json::from_str::<Vec<Value>>(r#"{"not":"an array"}"#)
            .expect_err("an object shouldn't parse as rows");

        let (status, body) = render(Error::MapLookup(backend::Error::InvalidResponse {
            target: "maps".into(),
            status: StatusCode::OK,
            body: r#"{"not":"an array"}"#.into(),
            source,
        }))
        .await?;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "upstream");
        assert_eq!(body["target"], "maps");
        assert_eq!(body["status"], 200);
        assert_eq!(body["body"], r#"{"not":"an array"}"#);

        Ok(())
    }

    #[tokio::test]
    async fn unmatched_routes_echo_the_path() -> anyhow::Result<()> {
        let (status, body) = render(Error::RouteNotFound {
            path: "/api/pois/unknown".into(),
        })
        .await?;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["ok"], false);
        assert_eq!(body["kind"], "route_not_found");
        assert_eq!(body["message"], "no match");
        assert_eq!(body["path"], "/api/pois/unknown");

        Ok(())
    }
}
