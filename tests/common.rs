//! Common code for integration tests

#![allow(dead_code, reason = "each test binary uses a different subset of these helpers")]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Error;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    Json, Router,
};
use poi_proxy::{config::Config, AppState};
use serde_json::Value;
use tokio::net::TcpListener;
use tower::ServiceExt;

/// The API key the app under test is configured with.
pub const ANON_KEY: &str = "test-anon-key";

/// A request the fake data service received.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Value,
}

/// What the fake data service responds with.
#[derive(Clone, Debug)]
pub struct Replies {
    pub rpc_status: StatusCode,
    pub rpc_body: Value,
    pub maps_status: StatusCode,
    pub maps_body: Value,

    /// How long to stall before answering a `maps` lookup.
    pub maps_delay: Option<Duration>,
}

impl Default for Replies {
    fn default() -> Self {
        Self {
            rpc_status: StatusCode::OK,
            rpc_body: Value::Array(Vec::new()),
            maps_status: StatusCode::OK,
            maps_body: Value::Array(Vec::new()),
            maps_delay: None,
        }
    }
}

/// The fake data service's shared state.
#[derive(Clone)]
struct Fake {
    replies: Arc<Replies>,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

/// An in-process stand-in for the hosted data service, listening on an ephemeral port.
pub struct FakeBackend {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeBackend {
    /// Starts a fake data service that answers with `replies`.
    pub async fn start(replies: Replies) -> Result<Self, Error> {
        let requests = Arc::new(Mutex::new(Vec::new()));

        let fake = Fake {
            replies: Arc::new(replies),
            requests: Arc::clone(&requests),
        };

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);

        let router = Router::new().fallback(respond).with_state(fake);
        tokio::spawn(async move { axum::serve(listener, router).await });

        Ok(Self { url, requests })
    }

    /// Gets every request received so far.
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests
            .lock()
            .expect("request log shouldn't be poisoned")
            .clone()
    }

    /// Gets the requests received for a path.
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == path)
            .collect()
    }
}

/// Records a request and answers it based on its path.
async fn respond(State(fake): State<Fake>, request: Request) -> impl IntoResponse {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    let path = parts.uri.path().to_owned();

    fake.requests
        .lock()
        .expect("request log shouldn't be poisoned")
        .push(Recorded {
            method: parts.method,
            path: path.clone(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
        });

    let replies = &fake.replies;

    if path.starts_with("/rest/v1/rpc/") {
        (replies.rpc_status, Json(replies.rpc_body.clone()))
    } else if path == "/rest/v1/maps" {
        if let Some(delay) = replies.maps_delay {
            tokio::time::sleep(delay).await;
        }

        (replies.maps_status, Json(replies.maps_body.clone()))
    } else {
        (StatusCode::OK, Json(Value::Array(Vec::new())))
    }
}

/// Builds the app under test, pointed at `backend_url`.
pub fn app(backend_url: &str) -> Result<Router, Error> {
    app_with(backend_url, &[])
}

/// Builds the app under test, pointed at `backend_url`, with extra environment variables.
pub fn app_with(backend_url: &str, extra: &[(&str, &str)]) -> Result<Router, Error> {
    let config = Config::from_vars(|key| match key {
        "SUPABASE_URL" => Some(backend_url.to_owned()),
        "SUPABASE_ANON_KEY" => Some(ANON_KEY.to_owned()),
        "MAP_STYLE_URL" => Some("https://tiles.example.com/style.json".to_owned()),
        "MAP_STYLE_KEY" => Some("test-style-key".to_owned()),
        _ => extra
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| (*value).to_owned()),
    })?;

    Ok(poi_proxy::app(AppState::new(config)?))
}

/// Sends a `GET` request through the app, returning the status, headers and JSON body.
pub async fn get(app: Router, uri: &str) -> Result<(StatusCode, HeaderMap, Value), Error> {
    send(app, Method::GET, uri).await
}

/// Sends a bodiless request through the app, returning the status, headers and JSON body.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
) -> Result<(StatusCode, HeaderMap, Value), Error> {
    let response = app
        .oneshot(
            axum::http::Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())?,
        )
        .await?;

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;

    Ok((status, headers, serde_json::from_slice(&bytes)?))
}
