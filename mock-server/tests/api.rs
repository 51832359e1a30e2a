use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_raw_query() {
    let resp = app().oneshot(get("/echo?a=1&b=x+y")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.query.as_deref(), Some("a=1&b=x+y"));
    assert!(echo.body.is_empty());
}

#[tokio::test]
async fn echo_without_query() {
    let resp = app().oneshot(get("/echo")).await.unwrap();

    let echo: Echo = body_json(resp).await;
    assert!(echo.query.is_none());
}

#[tokio::test]
async fn echo_reports_form_body_and_headers() {
    let request = Request::builder()
        .method("POST")
        .uri("/echo")
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-trace", "42")
        .body("name=fan+out&n=2".to_string())
        .unwrap();
    let resp = app().oneshot(request).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.body, "name=fan+out&n=2");
    assert_eq!(echo.headers["x-trace"], "42");
    assert_eq!(
        echo.headers["content-type"],
        "application/x-www-form-urlencoded"
    );
}

#[tokio::test]
async fn echo_accepts_put_and_delete() {
    for method in ["PUT", "DELETE"] {
        let request = Request::builder()
            .method(method)
            .uri("/echo")
            .body(String::new())
            .unwrap();
        let resp = app().oneshot(request).await.unwrap();
        let echo: Echo = body_json(resp).await;
        assert_eq!(echo.method, method);
    }
}

// --- status ---

#[tokio::test]
async fn status_returns_requested_code() {
    let resp = app().oneshot(get("/status/404")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(resp).await, "status 404");
}

#[tokio::test]
async fn status_non_numeric_returns_400() {
    let resp = app().oneshot(get("/status/teapot")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- delay ---

#[tokio::test]
async fn delay_answers_after_sleeping() {
    let started = std::time::Instant::now();
    let resp = app().oneshot(get("/delay/20")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(started.elapsed() >= std::time::Duration::from_millis(20));
    assert_eq!(body_bytes(resp).await, "slept 20ms");
}

// --- redirect ---

#[tokio::test]
async fn redirect_points_at_next_hop() {
    let resp = app().oneshot(get("/redirect/2")).await.unwrap();

    assert!(resp.status().is_redirection());
    assert_eq!(resp.headers()[http::header::LOCATION], "/redirect/1");
}

#[tokio::test]
async fn redirect_chain_ends_at_zero() {
    let resp = app().oneshot(get("/redirect/0")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, "arrived");
}

// --- headers ---

#[tokio::test]
async fn headers_route_sets_marker() {
    let resp = app().oneshot(get("/headers")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-fanout"], "mock");
    assert_eq!(body_bytes(resp).await, "ok");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let resp = app().oneshot(get("/missing")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
