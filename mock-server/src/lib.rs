//! In-memory stand-in for the ReportPortal launch API.
//!
//! `app()` serves a stateful subset of the API under `/api/v1` (launch
//! lifecycle, `/user`, project activity). `recorder()` serves a fixed reply on
//! every path and keeps the raw requests so tests can assert on the exact
//! wire shape. `spawn()` runs either router on a background thread.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const API_PREFIX: &str = "/api/v1";
pub const IN_PROGRESS: &str = "IN_PROGRESS";
pub const DEFAULT_USER: &str = "default";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Launch {
    pub id: Uuid,
    pub number: u64,
    pub project: String,
    pub name: String,
    pub description: String,
    pub mode: String,
    pub tags: Vec<String>,
    pub status: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
}

#[derive(Deserialize)]
pub struct StartLaunch {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "startTime")]
    pub start_time: DateTime<Utc>,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_mode() -> String {
    "DEFAULT".to_string()
}

#[derive(Deserialize)]
pub struct UpdateLaunch {
    pub description: Option<String>,
    pub mode: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct FinishLaunch {
    pub status: String,
    pub end_time: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub action_type: String,
    pub activity_id: String,
    pub history: Vec<FieldChange>,
    pub last_modified_date: DateTime<Utc>,
    pub logged_object_ref: String,
    pub object_name: String,
    pub object_type: String,
    pub project_ref: String,
    pub user_ref: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub new_value: String,
    pub old_value: String,
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(rename = "page.page", default = "first_page")]
    pub page: usize,
    #[serde(rename = "page.size", default = "default_page_size")]
    pub size: usize,
}

fn first_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

#[derive(Debug, Default)]
pub struct Store {
    pub launches: HashMap<Uuid, Launch>,
    pub activity: Vec<ActivityEntry>,
    next_number: u64,
}

impl Store {
    fn log(&mut self, action: &str, launch: &Launch, history: Vec<FieldChange>) {
        self.activity.push(ActivityEntry {
            action_type: action.to_string(),
            activity_id: Uuid::new_v4().to_string(),
            history,
            last_modified_date: Utc::now(),
            logged_object_ref: launch.id.to_string(),
            object_name: launch.name.clone(),
            object_type: "launch".to_string(),
            project_ref: launch.project.clone(),
            user_ref: DEFAULT_USER.to_string(),
        });
    }
}

pub type Db = Arc<RwLock<Store>>;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: String) -> ApiError {
    (status, Json(json!({ "errorCode": status.as_u16(), "message": message })))
}

fn not_found(id: Uuid) -> ApiError {
    api_error(StatusCode::NOT_FOUND, format!("Launch '{id}' not found."))
}

fn message(text: String) -> Json<serde_json::Value> {
    Json(json!({ "msg": text }))
}

pub fn app() -> Router {
    app_with_db(Db::default())
}

/// Same as `app()` but over a caller-owned store, so tests can inspect it.
pub fn app_with_db(db: Db) -> Router {
    let api = Router::new()
        .route("/user", get(current_user))
        .route("/{project}/launch", post(start_launch))
        .route("/{project}/launch/{id}", get(get_launch).delete(delete_launch))
        .route("/{project}/launch/{id}/update", put(update_launch))
        .route("/{project}/launch/{id}/stop", put(stop_launch))
        .route("/{project}/launch/{id}/finish", put(finish_launch))
        .route("/{project}/activity", get(list_activity))
        .layer(middleware::from_fn(require_bearer))
        .with_state(db);
    Router::new().nest(API_PREFIX, api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Serve `router` on an ephemeral local port from a dedicated thread.
pub fn spawn(router: Router) -> std::io::Result<SocketAddr> {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = std_listener.local_addr()?;
    std_listener.set_nonblocking(true)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::spawn(move || {
        let served = runtime.block_on(async {
            let listener = TcpListener::from_std(std_listener)?;
            axum::serve(listener, router).await
        });
        if let Err(err) = served {
            tracing::error!(%err, "mock server stopped");
        }
    });
    Ok(addr)
}

async fn require_bearer(request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("bearer ").or_else(|| value.strip_prefix("Bearer ")))
        .is_some_and(|token| !token.is_empty());
    if !authorized {
        return api_error(StatusCode::UNAUTHORIZED, "Full authentication is required".to_string())
            .into_response();
    }
    next.run(request).await
}

async fn current_user() -> Json<serde_json::Value> {
    Json(json!({ "userId": DEFAULT_USER, "accountType": "INTERNAL" }))
}

async fn start_launch(
    State(db): State<Db>,
    Path(project): Path<String>,
    Json(input): Json<StartLaunch>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut store = db.write().await;
    store.next_number += 1;
    let launch = Launch {
        id: Uuid::new_v4(),
        number: store.next_number,
        project,
        name: input.name,
        description: input.description,
        mode: input.mode,
        tags: input.tags,
        status: IN_PROGRESS.to_string(),
        start_time: input.start_time.timestamp_millis(),
        end_time: None,
    };
    tracing::info!(id = %launch.id, name = %launch.name, "launch started");
    store.log("startLaunch", &launch, Vec::new());
    store.launches.insert(launch.id, launch.clone());
    (
        StatusCode::CREATED,
        Json(json!({ "id": launch.id, "number": launch.number })),
    )
}

async fn get_launch(
    State(db): State<Db>,
    Path((project, id)): Path<(String, Uuid)>,
) -> Result<Json<Launch>, ApiError> {
    let store = db.read().await;
    store
        .launches
        .get(&id)
        .filter(|launch| launch.project == project)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(id))
}

async fn update_launch(
    State(db): State<Db>,
    Path((project, id)): Path<(String, Uuid)>,
    Json(input): Json<UpdateLaunch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut store = db.write().await;
    let launch = store
        .launches
        .get_mut(&id)
        .filter(|launch| launch.project == project)
        .ok_or_else(|| not_found(id))?;

    let mut history = Vec::new();
    if let Some(description) = input.description {
        history.push(change("description", &launch.description, &description));
        launch.description = description;
    }
    if let Some(mode) = input.mode {
        history.push(change("mode", &launch.mode, &mode));
        launch.mode = mode;
    }
    if let Some(tags) = input.tags {
        history.push(change("tags", &launch.tags.join(","), &tags.join(",")));
        launch.tags = tags;
    }
    let launch = launch.clone();
    store.log("updateLaunch", &launch, history);
    Ok(message(format!("Launch with ID = '{id}' successfully updated.")))
}

fn change(field: &str, old: &str, new: &str) -> FieldChange {
    FieldChange {
        field: field.to_string(),
        new_value: new.to_string(),
        old_value: old.to_string(),
    }
}

async fn stop_launch(
    State(db): State<Db>,
    Path((project, id)): Path<(String, Uuid)>,
    Json(input): Json<FinishLaunch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    terminate(db, project, id, input, "stopLaunch").await
}

async fn finish_launch(
    State(db): State<Db>,
    Path((project, id)): Path<(String, Uuid)>,
    Json(input): Json<FinishLaunch>,
) -> Result<Json<serde_json::Value>, ApiError> {
    terminate(db, project, id, input, "finishLaunch").await
}

async fn terminate(
    db: Db,
    project: String,
    id: Uuid,
    input: FinishLaunch,
    action: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut store = db.write().await;
    let launch = store
        .launches
        .get_mut(&id)
        .filter(|launch| launch.project == project)
        .ok_or_else(|| not_found(id))?;
    if launch.end_time.is_some() {
        return Err(api_error(
            StatusCode::NOT_ACCEPTABLE,
            format!("Launch '{id}' is already finished with status '{}'.", launch.status),
        ));
    }

    let history = vec![change("status", &launch.status, &input.status)];
    launch.status = input.status;
    launch.end_time = Some(input.end_time);
    let launch = launch.clone();
    tracing::info!(%id, status = %launch.status, action, "launch terminated");
    store.log(action, &launch, history);
    Ok(message(format!(
        "Launch with ID = '{id}' successfully {}.",
        if action == "stopLaunch" { "stopped" } else { "finished" }
    )))
}

async fn delete_launch(
    State(db): State<Db>,
    Path((project, id)): Path<(String, Uuid)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut store = db.write().await;
    let launch = store
        .launches
        .get(&id)
        .filter(|launch| launch.project == project)
        .ok_or_else(|| not_found(id))?;
    if launch.end_time.is_none() {
        return Err(api_error(
            StatusCode::NOT_ACCEPTABLE,
            format!("Unable to delete launch '{id}' in progress state."),
        ));
    }
    if let Some(launch) = store.launches.remove(&id) {
        store.log("deleteLaunch", &launch, Vec::new());
    }
    Ok(message(format!("Launch with ID = '{id}' successfully deleted.")))
}

async fn list_activity(
    State(db): State<Db>,
    Path(project): Path<String>,
    Query(query): Query<PageQuery>,
) -> Json<serde_json::Value> {
    let store = db.read().await;
    let size = query.size.max(1);
    let number = query.page.max(1);
    let matching: Vec<&ActivityEntry> = store
        .activity
        .iter()
        .filter(|entry| entry.project_ref == project)
        .collect();
    let total = matching.len();
    let content: Vec<&ActivityEntry> = matching
        .into_iter()
        .skip((number - 1).saturating_mul(size))
        .take(size)
        .collect();
    Json(json!({
        "content": content,
        "page": {
            "number": number,
            "size": size,
            "totalElements": total,
            "totalPages": total.div_ceil(size),
        }
    }))
}

// ---------------------------------------------------------------------------
// Request recorder
// ---------------------------------------------------------------------------

/// A request as received on the wire.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Shared log of the requests a `recorder()` router received.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Recorder {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<RecordedRequest> {
        self.requests().pop()
    }
}

#[derive(Clone)]
struct Reply {
    recorder: Recorder,
    status: StatusCode,
    body: String,
}

/// Router answering every request with `status` and `body`.
pub fn recorder(status: StatusCode, body: &str) -> (Router, Recorder) {
    let recorder = Recorder::default();
    let reply = Reply {
        recorder: recorder.clone(),
        status,
        body: body.to_string(),
    };
    (Router::new().fallback(record).with_state(reply), recorder)
}

async fn record(
    State(reply): State<Reply>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    if let Ok(mut requests) = reply.recorder.requests.lock() {
        requests.push(RecordedRequest {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers,
            body,
        });
    }
    (reply.status, reply.body)
}
