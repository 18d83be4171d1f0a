// Outcome of a seeding run

use reqwest::StatusCode;
use serde_json::Value;

use crate::images::Orientation;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedImage {
    pub name: String,
    pub id: String,
    pub orientation: Orientation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedUpload {
    pub name: String,
    pub status: StatusCode,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeedReport {
    pub user_id: String,
    pub created_user: bool,
    /// Images removed by the cleanup step
    pub deleted: usize,
    /// Delete calls the backend refused
    pub delete_failures: usize,
    /// In upload order
    pub uploaded: Vec<UploadedImage>,
    pub failed: Vec<FailedUpload>,
    /// Image names as returned by a newest-first query after uploading
    pub observed_order: Vec<String>,
    pub order_verified: bool,
}

impl SeedReport {
    pub fn new(user_id: String, created_user: bool) -> Self {
        Self {
            user_id,
            created_user,
            deleted: 0,
            delete_failures: 0,
            uploaded: Vec::new(),
            failed: Vec::new(),
            observed_order: Vec::new(),
            order_verified: false,
        }
    }

    pub fn all_uploaded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn log_summary(&self) {
        tracing::info!(
            user_id = %self.user_id,
            created_user = self.created_user,
            deleted = self.deleted,
            uploaded = self.uploaded.len(),
            failed = self.failed.len(),
            order_verified = self.order_verified,
            "seeding finished"
        );
        for failure in &self.failed {
            tracing::warn!(name = %failure.name, status = %failure.status, body = %failure.body, "upload failed");
        }
        if !self.observed_order.is_empty() {
            tracing::info!("Display order (newest first): {}", self.observed_order.join(", "));
        }
    }
}
