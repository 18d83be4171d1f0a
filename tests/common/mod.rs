// Common test utilities shared across test files
//
// An in-memory stand-in for the backend: enough of the collections/records
// API to run the whole seeding workflow against a real HTTP socket.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use slideshow_seed::images::{Color, PlaceholderSpec};
use slideshow_seed::SeedConfig;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

#[allow(dead_code)]
pub const ADMIN_IDENTITY: &str = "admin@local.host";
#[allow(dead_code)]
pub const ADMIN_PASSWORD: &str = "password123";
pub const ADMIN_TOKEN: &str = "test-admin-token";

#[derive(Debug, Clone)]
pub struct MockUser {
    pub id: String,
    pub email: String,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct MockImage {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub file_name: Option<String>,
    pub file_len: usize,
    pub seq: u64,
}

/// Mutable backend state, inspected by tests after a run
pub struct MockState {
    pub admin_identity: String,
    pub admin_password: String,
    pub has_images_collection: bool,
    pub image_fields: Vec<String>,
    pub reject_user_creation: bool,
    pub fail_upload_names: HashSet<String>,
    /// Upper bound the server applies to the requested perPage
    pub max_per_page: usize,
    pub users: Vec<MockUser>,
    pub images: Vec<MockImage>,
    /// (method, path) of every request, in arrival order
    pub requests: Vec<(Method, String)>,
    next_seq: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            admin_identity: ADMIN_IDENTITY.to_string(),
            admin_password: ADMIN_PASSWORD.to_string(),
            has_images_collection: true,
            image_fields: ["id", "file", "name", "owner", "created", "updated"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            reject_user_creation: false,
            fail_upload_names: HashSet::new(),
            max_per_page: 500,
            users: Vec::new(),
            images: Vec::new(),
            requests: Vec::new(),
            next_seq: 0,
        }
    }
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> (String, u64) {
        self.next_seq += 1;
        (format!("{}{:012}", prefix, self.next_seq), self.next_seq)
    }

    #[allow(dead_code)]
    pub fn insert_image(&mut self, owner: &str, name: &str) -> String {
        let (id, seq) = self.next_id("img");
        self.images.push(MockImage {
            id: id.clone(),
            owner: owner.to_string(),
            name: name.to_string(),
            file_name: Some(name.to_string()),
            file_len: 0,
            seq,
        });
        id
    }

    #[allow(dead_code)]
    pub fn images_of(&self, owner: &str) -> Vec<MockImage> {
        self.images.iter().filter(|i| i.owner == owner).cloned().collect()
    }

    /// Image names for `owner`, newest first
    #[allow(dead_code)]
    pub fn newest_first_names(&self, owner: &str) -> Vec<String> {
        let mut images = self.images_of(owner);
        images.sort_by(|a, b| b.seq.cmp(&a.seq));
        images.into_iter().map(|i| i.name).collect()
    }

    #[allow(dead_code)]
    pub fn count_requests(&self, method: &Method, path: &str) -> usize {
        self.requests
            .iter()
            .filter(|(m, p)| m == method && p == path)
            .count()
    }
}

pub type SharedState = Arc<Mutex<MockState>>;

pub struct MockBackend {
    pub base_url: String,
    pub state: SharedState,
}

impl MockBackend {
    #[allow(dead_code)]
    pub fn with_state<F: FnOnce(&mut MockState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }

    #[allow(dead_code)]
    pub fn snapshot<T, F: FnOnce(&MockState) -> T>(&self, f: F) -> T {
        f(&self.state.lock().unwrap())
    }
}

/// Serve `router` on an ephemeral local port, returning its base URL
pub async fn spawn_router(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Start a mock backend with default state
#[allow(dead_code)]
pub async fn spawn_backend() -> MockBackend {
    spawn_backend_with(MockState::default()).await
}

pub async fn spawn_backend_with(initial: MockState) -> MockBackend {
    let state: SharedState = Arc::new(Mutex::new(initial));

    let router = Router::new()
        .route("/api/collections/_superusers/auth-with-password", post(auth_with_password))
        .route("/api/collections", get(list_collections))
        .route("/api/collections/users/records", get(list_users).post(create_user))
        .route("/api/collections/images/records", get(list_images).post(create_image))
        .route(
            "/api/collections/images/records/{id}",
            axum::routing::delete(delete_image),
        )
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .with_state(state.clone());

    let base_url = spawn_router(router).await;
    MockBackend { base_url, state }
}

/// Config pointing at `backend`, writing images into `output_dir`, with a
/// scaled-down plan so tests stay fast
#[allow(dead_code)]
pub fn test_config(backend: &MockBackend, output_dir: &std::path::Path) -> SeedConfig {
    let mut config = SeedConfig::default();
    config.base_url = backend.base_url.clone();
    config.output_dir = output_dir.to_path_buf();
    config.images = vec![
        PlaceholderSpec::new("portrait_old.png", Color([0, 0, 255]), 50, 100),
        PlaceholderSpec::new("landscape_mid.png", Color([255, 0, 0]), 100, 50),
        PlaceholderSpec::new("portrait_new.png", Color([0, 128, 0]), 50, 100),
    ];
    config
}

async fn record_request(
    State(state): State<SharedState>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    state
        .lock()
        .unwrap()
        .requests
        .push((request.method().clone(), path));
    next.run(request).await
}

fn error(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"status": status.as_u16(), "message": message, "data": {}})),
    )
        .into_response()
}

fn is_admin(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(ADMIN_TOKEN)
}

fn page_of(items: Vec<Value>, page: usize, per_page: usize) -> Value {
    let total = items.len();
    let total_pages = if total == 0 { 0 } else { total.div_ceil(per_page) };
    let slice: Vec<Value> = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();
    json!({
        "page": page,
        "perPage": per_page,
        "totalItems": total,
        "totalPages": total_pages,
        "items": slice,
    })
}

// First quoted literal of a filter, e.g. email="x" -> x. Like the real
// parser, only a backslash before the opening quote is an escape.
fn filter_value(filter: &str) -> Option<String> {
    let start = filter.find(['"', '\''])?;
    let mut chars = filter[start..].chars();
    let quote = chars.next()?;
    let mut value = String::new();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.clone().next() == Some(quote) {
            value.push(quote);
            chars.next();
        } else if c == quote {
            return Some(value);
        } else {
            value.push(c);
        }
    }
    None
}

fn paging(query: &HashMap<String, String>, max_per_page: usize) -> (usize, usize) {
    let page = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1).max(1);
    let per_page = query
        .get("perPage")
        .and_then(|p| p.parse().ok())
        .unwrap_or(30)
        .clamp(1, max_per_page);
    (page, per_page)
}

async fn auth_with_password(State(state): State<SharedState>, Json(body): Json<Value>) -> Response {
    let state = state.lock().unwrap();
    if body["identity"] == state.admin_identity.as_str() && body["password"] == state.admin_password.as_str() {
        Json(json!({
            "token": ADMIN_TOKEN,
            "record": {"id": "superuser0001", "email": state.admin_identity},
        }))
        .into_response()
    } else {
        error(StatusCode::BAD_REQUEST, "Failed to authenticate.")
    }
}

async fn list_collections(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    if !is_admin(&headers) {
        return error(StatusCode::UNAUTHORIZED, "The request requires valid authorization token.");
    }
    let state = state.lock().unwrap();
    let mut items = vec![json!({
        "name": "users",
        "type": "auth",
        "fields": [{"name": "id"}, {"name": "email"}, {"name": "slideshow_order"}],
    })];
    if state.has_images_collection {
        let fields: Vec<Value> = state.image_fields.iter().map(|f| json!({"name": f})).collect();
        items.push(json!({"name": "images", "type": "base", "fields": fields}));
    }
    Json(page_of(items, 1, 500)).into_response()
}

async fn list_users(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !is_admin(&headers) {
        return error(StatusCode::FORBIDDEN, "Only superusers can perform this action.");
    }
    let state = state.lock().unwrap();
    let email = query.get("filter").and_then(|f| filter_value(f));
    let items: Vec<Value> = state
        .users
        .iter()
        .filter(|u| email.as_deref().map_or(true, |e| u.email == e))
        .map(|u| u.body.clone())
        .collect();
    let (page, per_page) = paging(&query, state.max_per_page);
    Json(page_of(items, page, per_page)).into_response()
}

async fn create_user(State(state): State<SharedState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !is_admin(&headers) {
        return error(StatusCode::FORBIDDEN, "Only superusers can perform this action.");
    }
    let mut state = state.lock().unwrap();
    if state.reject_user_creation {
        return error(StatusCode::BAD_REQUEST, "Failed to create record.");
    }
    let Some(email) = body["email"].as_str().map(str::to_string) else {
        return error(StatusCode::BAD_REQUEST, "Missing email.");
    };
    if body["password"] != body["passwordConfirm"] {
        return error(StatusCode::BAD_REQUEST, "Passwords don't match.");
    }
    if state.users.iter().any(|u| u.email == email) {
        return error(StatusCode::BAD_REQUEST, "Value must be unique.");
    }

    let (id, _) = state.next_id("usr");
    let mut record = body.clone();
    if let Value::Object(map) = &mut record {
        map.remove("password");
        map.remove("passwordConfirm");
        map.insert("id".to_string(), json!(id));
        map.insert("collectionName".to_string(), json!("users"));
    }
    state.users.push(MockUser {
        id,
        email,
        body: record.clone(),
    });
    Json(record).into_response()
}

fn image_json(image: &MockImage) -> Value {
    json!({
        "id": image.id,
        "owner": image.owner,
        "name": image.name,
        "file": image.file_name,
        "created": format!("2025-01-01 00:00:{:02}.000Z", image.seq % 60),
    })
}

async fn list_images(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !is_admin(&headers) {
        return error(StatusCode::FORBIDDEN, "Only superusers can perform this action.");
    }
    let state = state.lock().unwrap();
    let owner = query.get("filter").and_then(|f| filter_value(f));
    let mut images: Vec<&MockImage> = state
        .images
        .iter()
        .filter(|i| owner.as_deref().map_or(true, |o| i.owner == o))
        .collect();
    // Newest first unless ascending order is asked for
    match query.get("sort").map(String::as_str) {
        Some("created") => images.sort_by(|a, b| a.seq.cmp(&b.seq)),
        _ => images.sort_by(|a, b| b.seq.cmp(&a.seq)),
    }
    let items = images.into_iter().map(image_json).collect();
    let (page, per_page) = paging(&query, state.max_per_page);
    Json(page_of(items, page, per_page)).into_response()
}

async fn create_image(State(state): State<SharedState>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    if !is_admin(&headers) {
        return error(StatusCode::FORBIDDEN, "Only superusers can perform this action.");
    }

    let mut fields: HashMap<String, String> = HashMap::new();
    let mut file: Option<(Option<String>, usize)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let Ok(data) = field.bytes().await else {
            return error(StatusCode::BAD_REQUEST, "Malformed multipart body.");
        };
        if name == "file" {
            file = Some((file_name, data.len()));
        } else {
            fields.insert(name, String::from_utf8_lossy(&data).to_string());
        }
    }

    let mut state = state.lock().unwrap();
    let name = fields.get("name").cloned().unwrap_or_default();
    if state.fail_upload_names.contains(&name) {
        return error(StatusCode::BAD_REQUEST, "Failed to create record.");
    }
    let Some(owner) = fields.get("owner").cloned() else {
        return error(StatusCode::BAD_REQUEST, "Missing owner.");
    };
    let Some((file_name, file_len)) = file.filter(|(_, len)| *len > 0) else {
        return error(StatusCode::BAD_REQUEST, "Missing file.");
    };

    let (id, seq) = state.next_id("img");
    let image = MockImage {
        id,
        owner,
        name,
        file_name,
        file_len,
        seq,
    };
    let body = image_json(&image);
    state.images.push(image);
    Json(body).into_response()
}

async fn delete_image(State(state): State<SharedState>, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !is_admin(&headers) {
        return error(StatusCode::FORBIDDEN, "Only superusers can perform this action.");
    }
    let mut state = state.lock().unwrap();
    let before = state.images.len();
    state.images.retain(|i| i.id != id);
    if state.images.len() == before {
        return error(StatusCode::NOT_FOUND, "The requested resource wasn't found.");
    }
    StatusCode::NO_CONTENT.into_response()
}
