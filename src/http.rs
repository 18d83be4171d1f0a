// JSON and multipart request helper
//
// Every request yields an ApiResponse carrying the status code and the
// parsed JSON body, including 4xx/5xx answers. Only transport failures and
// bodies that are not JSON become errors.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{SeedError, TransportResultExt};

/// Status code and parsed JSON body of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    /// Exactly 200, the only status the backend uses for a successful create or auth.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// A local file sent as one multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    pub field: String,
    pub path: PathBuf,
}

impl FileField {
    pub fn new(field: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            field: field.to_string(),
            path: path.into(),
        }
    }
}

/// A request description: method, URL, optional JSON payload, headers, files.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    url: Url,
    payload: Option<Value>,
    headers: Vec<(String, String)>,
    files: Vec<FileField>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            payload: None,
            headers: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// JSON body, or the text parts when files are attached
    pub fn json(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn file(mut self, field: FileField) -> Self {
        self.files.push(field);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Thin wrapper around `reqwest::Client`.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, SeedError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let inner = builder.build().transport_err("Failed to create HTTP client")?;
        Ok(Self { inner })
    }

    /// Send the request and wait for the full response.
    ///
    /// Files take precedence: with files the payload's top-level fields are
    /// sent as text parts of a multipart body. Without files a payload is
    /// sent as JSON. Otherwise the request has no body.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SeedError> {
        let context = format!("{} {}", request.method, request.url.path());
        let mut builder = self
            .inner
            .request(request.method.clone(), request.url.clone())
            .headers(build_headers(&request.headers)?);

        if !request.files.is_empty() {
            let form = build_form(request.payload.as_ref(), &request.files).await?;
            builder = builder.multipart(form);
        } else if let Some(payload) = &request.payload {
            builder = builder.json(payload);
        }

        let response = builder.send().await.transport_err(&context)?;
        let status = response.status();
        let text = response.text().await.transport_err(&context)?;

        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(ApiResponse {
                status,
                body: json!({}),
            });
        }

        let body = serde_json::from_str(&text).map_err(|e| {
            SeedError::MalformedResponse(format!("{} returned {} with non-JSON body: {}", context, status, e))
        })?;
        Ok(ApiResponse { status, body })
    }
}

fn build_headers(headers: &[(String, String)]) -> Result<HeaderMap, SeedError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SeedError::Config(format!("Invalid header name '{}': {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| SeedError::Config(format!("Invalid value for header '{}': {}", name, e)))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

async fn build_form(payload: Option<&Value>, files: &[FileField]) -> Result<Form, SeedError> {
    let mut form = Form::new();

    if let Some(Value::Object(fields)) = payload {
        for (key, value) in fields {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), text);
        }
    }

    for file in files {
        let content = tokio::fs::read(&file.path).await?;
        let part = Part::bytes(content)
            .file_name(file_name(&file.path))
            .mime_str("application/octet-stream")
            .transport_err("Invalid multipart content type")?;
        form = form.part(file.field.clone(), part);
    }

    Ok(form)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
