// Typed endpoints of the backend REST API
//
// Every call returns the raw ApiResponse so callers can decide whether a
// non-200 answer aborts the run or is only reported.

use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::config::{AdminCredentials, SeedUser};
use crate::error::SeedError;
use crate::http::{ApiRequest, ApiResponse, FileField, HttpClient};

pub const USERS_COLLECTION: &str = "users";
pub const IMAGES_COLLECTION: &str = "images";
pub const OWNER_FIELD: &str = "owner";

/// Collections are listed in one page; the backend caps perPage well above this.
const COLLECTIONS_PER_PAGE: u32 = 500;
pub const RECORDS_PER_PAGE: u32 = 200;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default, rename = "perPage")]
    pub per_page: u32,
    #[serde(default, rename = "totalItems")]
    pub total_items: i64,
    #[serde(default, rename = "totalPages")]
    pub total_pages: i64,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Collection {
    pub name: String,
    // Pre-0.23 servers call this list "schema"
    #[serde(default, alias = "schema")]
    pub fields: Vec<CollectionField>,
}

impl Collection {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CollectionField {
    pub name: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created: String,
}

/// Decode a typed value out of a response body.
pub fn decode<T: serde::de::DeserializeOwned>(response: &ApiResponse, what: &str) -> Result<T, SeedError> {
    serde_json::from_value(response.body.clone())
        .map_err(|e| SeedError::MalformedResponse(format!("{}: {}", what, e)))
}

pub struct PocketBase {
    http: HttpClient,
    base: Url,
    token: Option<String>,
}

impl PocketBase {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, SeedError> {
        // Trailing slash so joins keep any path prefix of the base URL
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base = Url::parse(&normalized)
            .map_err(|e| SeedError::Config(format!("base_url '{}': {}", base_url, e)))?;

        Ok(Self {
            http: HttpClient::new(timeout)?,
            base,
            token: None,
        })
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Build `{base}/api/collections/{segments...}` with each segment escaped.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, SeedError> {
        let mut url = self
            .base
            .join("api/collections")
            .map_err(|e| SeedError::Config(format!("Cannot build endpoint URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SeedError::Config(format!("base_url '{}' cannot carry a path", self.base)))?
            .extend(segments);
        Ok(url)
    }

    fn records_url(&self, collection: &str) -> Result<Url, SeedError> {
        self.endpoint(&[collection, "records"])
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SeedError> {
        let request = match &self.token {
            Some(token) => request.header("Authorization", token),
            None => request,
        };
        let (method, path) = (request.method().clone(), request.url().path().to_string());
        let response = self.http.send(request).await?;
        tracing::debug!(%method, %path, status = %response.status, "api call");
        Ok(response)
    }

    pub async fn auth_with_password(&self, admin: &AdminCredentials) -> Result<ApiResponse, SeedError> {
        let url = self.endpoint(&["_superusers", "auth-with-password"])?;
        self.send(ApiRequest::post(url).json(json!({
            "identity": admin.identity,
            "password": admin.password,
        })))
        .await
    }

    pub async fn list_collections(&self) -> Result<ApiResponse, SeedError> {
        let mut url = self.endpoint(&[])?;
        url.query_pairs_mut()
            .append_pair("perPage", &COLLECTIONS_PER_PAGE.to_string());
        self.send(ApiRequest::get(url)).await
    }

    pub async fn find_users_by_email(&self, email: &str) -> Result<ApiResponse, SeedError> {
        let mut url = self.records_url(USERS_COLLECTION)?;
        url.query_pairs_mut()
            .append_pair("filter", &format!("email=\"{}\"", escape_filter_value(email, '"')));
        self.send(ApiRequest::get(url)).await
    }

    pub async fn create_user(&self, user: &SeedUser) -> Result<ApiResponse, SeedError> {
        let mut body = json!({
            "email": user.email,
            "password": user.password,
            "passwordConfirm": user.password,
        });
        let prefs = serde_json::to_value(&user.preferences)
            .map_err(|e| SeedError::Config(format!("Cannot encode preferences: {}", e)))?;
        if let (Value::Object(body), Value::Object(prefs)) = (&mut body, prefs) {
            body.extend(prefs);
        }

        let url = self.records_url(USERS_COLLECTION)?;
        self.send(ApiRequest::post(url).json(body)).await
    }

    /// One page of the owner's images, optionally sorted (e.g. `-created`).
    pub async fn list_images_page(
        &self,
        owner: &str,
        page: u32,
        sort: Option<&str>,
    ) -> Result<ApiResponse, SeedError> {
        let mut url = self.records_url(IMAGES_COLLECTION)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("filter", &format!("{}='{}'", OWNER_FIELD, escape_filter_value(owner, '\'')))
                .append_pair("page", &page.to_string())
                .append_pair("perPage", &RECORDS_PER_PAGE.to_string());
            if let Some(sort) = sort {
                query.append_pair("sort", sort);
            }
        }
        self.send(ApiRequest::get(url)).await
    }

    pub async fn delete_image(&self, id: &str) -> Result<ApiResponse, SeedError> {
        let url = self.endpoint(&[IMAGES_COLLECTION, "records", id])?;
        self.send(ApiRequest::delete(url)).await
    }

    pub async fn upload_image(&self, owner: &str, name: &str, path: &Path) -> Result<ApiResponse, SeedError> {
        let url = self.records_url(IMAGES_COLLECTION)?;
        let request = ApiRequest::post(url)
            .json(json!({ "owner": owner, "name": name }))
            .file(FileField::new("file", path));
        self.send(request).await
    }
}

// The filter parser only unescapes the quote that opened the literal, so
// that is the only character escaped here
fn escape_filter_value(value: &str, quote: char) -> String {
    value.replace(quote, &format!("\\{}", quote))
}
