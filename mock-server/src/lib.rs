use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    extract::{Path, RawQuery},
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Longest delay `/delay/{ms}` will sleep for.
pub const MAX_DELAY_MS: u64 = 10_000;

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", get(status))
        .route("/delay/{ms}", get(delay))
        .route("/redirect/{hops}", get(redirect))
        .route("/headers", get(with_headers))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        query,
        headers,
        body,
    })
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn delay(Path(ms): Path<u64>) -> String {
    let ms = ms.min(MAX_DELAY_MS);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    format!("slept {ms}ms")
}

/// Redirects `hops` times before answering 200.
async fn redirect(Path(hops): Path<u32>) -> Response {
    match hops {
        0 => "arrived".into_response(),
        n => Redirect::to(&format!("/redirect/{}", n - 1)).into_response(),
    }
}

async fn with_headers() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/plain"),
            (HeaderName::from_static("x-fanout"), "mock"),
        ],
        "ok",
    )
}
