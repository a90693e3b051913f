use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, recorder, Launch};
use tower::ServiceExt;

const TOKEN: &str = "bearer test-token";

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::AUTHORIZATION, TOKEN)
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, TOKEN)
        .body(String::new())
        .unwrap()
}

const START: &str = r#"{"name":"nightly","description":"d","startTime":"2023-11-14T22:13:20Z","mode":"DEFAULT","tags":["a"]}"#;
const FINISH: &str = r#"{"status":"PASSED","end_time":1700000001000}"#;
const MISSING: &str = "/api/v1/demo/launch/00000000-0000-0000-0000-000000000000";

// --- auth ---

#[tokio::test]
async fn user_requires_token() {
    let resp = app()
        .oneshot(Request::builder().uri("/api/v1/user").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_with_token_returns_200() {
    let resp = app().oneshot(empty_request("GET", "/api/v1/user")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let user: serde_json::Value = body_json(resp).await;
    assert_eq!(user["userId"], "default");
}

// --- start ---

#[tokio::test]
async fn start_launch_returns_201_with_id() {
    let resp = app()
        .oneshot(json_request("POST", "/api/v1/demo/launch", START))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: serde_json::Value = body_json(resp).await;
    assert!(created["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(created["number"], 1);
}

#[tokio::test]
async fn start_launch_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/api/v1/demo/launch", r#"{"not_name":1}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- unknown launch ---

#[tokio::test]
async fn update_unknown_launch_returns_404() {
    let resp = app()
        .oneshot(json_request("PUT", &format!("{MISSING}/update"), "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn finish_unknown_launch_returns_404() {
    let resp = app()
        .oneshot(json_request("PUT", &format!("{MISSING}/finish"), FINISH))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_unknown_launch_returns_404() {
    let resp = app().oneshot(empty_request("DELETE", MISSING)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_launch_id_returns_400() {
    let resp = app()
        .oneshot(empty_request("DELETE", "/api/v1/demo/launch/not-a-uuid"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- activity ---

#[tokio::test]
async fn activity_with_huge_page_is_empty() {
    let max = usize::MAX;
    let resp = app()
        .oneshot(empty_request(
            "GET",
            &format!("/api/v1/demo/activity?page.page={max}&page.size={max}"),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let activity: serde_json::Value = body_json(resp).await;
    assert_eq!(activity["content"], serde_json::json!([]));
    assert_eq!(activity["page"]["totalElements"], 0);
}

// --- recorder ---

#[tokio::test]
async fn recorder_captures_request_and_replies() {
    let (router, recorded) = recorder(StatusCode::INTERNAL_SERVER_ERROR, "boom");
    let resp = router
        .oneshot(json_request("PUT", "/api/v1/p/launch/x/stop?a=b", FINISH))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_bytes(resp).await, "boom");

    let req = recorded.last().unwrap();
    assert_eq!(req.method, http::Method::PUT);
    assert_eq!(req.path, "/api/v1/p/launch/x/stop");
    assert_eq!(req.query.as_deref(), Some("a=b"));
    assert_eq!(req.header("content-type"), Some("application/json"));
    assert_eq!(req.body, FINISH);
}

// --- full lifecycle ---

#[tokio::test]
async fn launch_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // start
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/api/v1/demo/launch", START))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: serde_json::Value = body_json(resp).await;
    let id = created["id"].as_str().unwrap().to_string();
    let launch_uri = format!("/api/v1/demo/launch/{id}");

    // delete while in progress is refused
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &launch_uri))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);

    // update description only
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("{launch_uri}/update"),
            r#"{"description":"updated"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &launch_uri))
        .await
        .unwrap();
    let launch: Launch = body_json(resp).await;
    assert_eq!(launch.description, "updated");
    assert_eq!(launch.tags, vec!["a"]); // unchanged
    assert_eq!(launch.status, "IN_PROGRESS");

    // finish
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PUT", &format!("{launch_uri}/finish"), FINISH))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // stop after finish is refused
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("{launch_uri}/stop"),
            r#"{"status":"STOPPED","end_time":1700000002000}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &launch_uri))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // get after delete: 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &launch_uri))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // activity: start, update, finish, delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/api/v1/demo/activity?page.page=1&page.size=3"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let activity: serde_json::Value = body_json(resp).await;
    let actions: Vec<&str> = activity["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["actionType"].as_str().unwrap())
        .collect();
    assert_eq!(actions, ["startLaunch", "updateLaunch", "finishLaunch"]);
    assert_eq!(activity["page"]["totalElements"], 4);
    assert_eq!(activity["page"]["totalPages"], 2);
    assert_eq!(activity["content"][1]["history"][0]["oldValue"], "d");
}
