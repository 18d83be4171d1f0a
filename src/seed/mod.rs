// Seeding workflow: admin auth, schema check, user resolution, cleanup,
// placeholder generation and ordered upload.
//
// Every step before the uploads is all-or-nothing. Uploads are reported
// individually and the loop keeps going.

pub mod report;

pub use report::{FailedUpload, SeedReport, UploadedImage};

use std::path::PathBuf;
use std::time::Duration;

use crate::config::SeedConfig;
use crate::error::SeedError;
use crate::images;
use crate::pocketbase::{
    decode, Collection, Page, PocketBase, Record, IMAGES_COLLECTION, OWNER_FIELD, RECORDS_PER_PAGE,
};

const NEWEST_FIRST: &str = "-created";

pub struct Seeder {
    api: PocketBase,
    config: SeedConfig,
}

impl Seeder {
    pub fn new(config: SeedConfig) -> Result<Self, SeedError> {
        config.validate()?;
        let api = PocketBase::new(&config.base_url, config.timeout_secs.map(Duration::from_secs))?;
        Ok(Self { api, config })
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    pub async fn run(mut self) -> Result<SeedReport, SeedError> {
        self.authenticate().await?;
        self.check_schema().await?;

        let (user_id, created_user) = self.resolve_user().await?;
        let mut report = SeedReport::new(user_id, created_user);

        if self.config.cleanup {
            self.cleanup_images(&mut report).await?;
        } else {
            tracing::info!("Cleanup disabled, keeping existing images");
        }

        let paths = images::prepare_all(&self.config.output_dir, &self.config.images).await?;
        self.upload_images(&paths, &mut report).await?;

        if report.all_uploaded() {
            self.verify_order(&mut report).await?;
        } else {
            tracing::warn!("Skipping order verification, {} upload(s) failed", report.failed.len());
        }

        Ok(report)
    }

    async fn authenticate(&mut self) -> Result<(), SeedError> {
        tracing::info!("Authenticating admin...");
        let response = self.api.auth_with_password(&self.config.admin).await?;
        if !response.is_ok() {
            return Err(SeedError::AuthFailed {
                status: response.status,
                body: response.body,
            });
        }

        let token = response.body["token"]
            .as_str()
            .ok_or_else(|| SeedError::MalformedResponse("auth response has no token".to_string()))?;
        self.api.set_token(token.to_string());
        Ok(())
    }

    async fn check_schema(&self) -> Result<(), SeedError> {
        tracing::info!("Checking schema...");
        let response = self.api.list_collections().await?;
        if !response.is_ok() {
            return Err(SeedError::SchemaLookupFailed {
                status: response.status,
                body: response.body,
            });
        }

        let collections: Page<Collection> = decode(&response, "collection list")?;
        let Some(images) = collections.items.iter().find(|c| c.name == IMAGES_COLLECTION) else {
            return Err(SeedError::CollectionMissing(IMAGES_COLLECTION.to_string()));
        };

        tracing::info!("Found fields: {:?}", images.field_names());
        if !images.has_field(OWNER_FIELD) {
            return Err(SeedError::FieldMissing {
                collection: IMAGES_COLLECTION.to_string(),
                field: OWNER_FIELD.to_string(),
            });
        }
        Ok(())
    }

    /// Returns the user id and whether it was created by this run.
    async fn resolve_user(&self) -> Result<(String, bool), SeedError> {
        let user = &self.config.user;
        let response = self.api.find_users_by_email(&user.email).await?;
        if !response.is_ok() {
            return Err(SeedError::UserLookupFailed {
                status: response.status,
                body: response.body,
            });
        }

        let existing: Page<Record> = decode(&response, "user list")?;
        if let Some(record) = existing.items.into_iter().next() {
            tracing::info!(user_id = %record.id, "User exists");
            return Ok((record.id, false));
        }

        tracing::info!(email = %user.email, "Creating user...");
        let response = self.api.create_user(user).await?;
        if !response.is_ok() {
            return Err(SeedError::UserCreationFailed {
                status: response.status,
                body: response.body,
            });
        }

        let created: Record = decode(&response, "created user")?;
        tracing::info!(user_id = %created.id, "User created");
        Ok((created.id, true))
    }

    async fn cleanup_images(&self, report: &mut SeedReport) -> Result<(), SeedError> {
        tracing::info!("Cleaning up old images...");
        let Some(existing) = self.owner_images(&report.user_id, None).await? else {
            tracing::warn!("Could not list existing images, skipping cleanup");
            return Ok(());
        };

        for record in existing {
            let response = self.api.delete_image(&record.id).await?;
            if response.is_success() {
                report.deleted += 1;
            } else {
                report.delete_failures += 1;
                tracing::warn!(id = %record.id, status = %response.status, body = %response.body, "Delete failed");
            }
        }
        tracing::info!(deleted = report.deleted, "Cleanup done");
        Ok(())
    }

    // Strictly sequential: creation order is what the newest-first sort sees
    async fn upload_images(&self, paths: &[PathBuf], report: &mut SeedReport) -> Result<(), SeedError> {
        for (spec, path) in self.config.images.iter().zip(paths) {
            tracing::info!("Uploading {}...", spec.name);
            let response = self.api.upload_image(&report.user_id, &spec.name, path).await?;

            if !response.is_ok() {
                tracing::warn!(name = %spec.name, status = %response.status, body = %response.body, "Upload failed");
                report.failed.push(FailedUpload {
                    name: spec.name.clone(),
                    status: response.status,
                    body: response.body,
                });
                continue;
            }

            let record: Record = decode(&response, "created image")?;
            report.uploaded.push(UploadedImage {
                name: spec.name.clone(),
                id: record.id,
                orientation: spec.orientation(),
            });
        }
        Ok(())
    }

    async fn verify_order(&self, report: &mut SeedReport) -> Result<(), SeedError> {
        let Some(records) = self.owner_images(&report.user_id, Some(NEWEST_FIRST)).await? else {
            tracing::warn!("Could not list images, order not verified");
            return Ok(());
        };

        let expected: Vec<String> = self
            .config
            .images
            .iter()
            .rev()
            .map(|spec| spec.name.clone())
            .collect();
        report.observed_order = records.into_iter().map(|r| r.name).collect();
        report.order_verified = report.observed_order == expected;

        if !report.order_verified {
            tracing::warn!(
                expected = ?expected,
                observed = ?report.observed_order,
                "Newest-first order does not match the upload plan"
            );
        }
        Ok(())
    }

    /// All images of `owner`, page by page. `None` if the backend refused a page.
    async fn owner_images(&self, owner: &str, sort: Option<&str>) -> Result<Option<Vec<Record>>, SeedError> {
        let mut records = Vec::new();
        let mut page_no = 1;
        loop {
            let response = self.api.list_images_page(owner, page_no, sort).await?;
            if !response.is_ok() {
                tracing::warn!(status = %response.status, body = %response.body, "Listing images failed");
                return Ok(None);
            }

            let page: Page<Record> = decode(&response, "image list")?;
            let fetched = page.items.len();
            records.extend(page.items);

            // Servers may cap perPage, so a short page only ends the listing
            // when no page count was reported
            let done = if page.total_pages > 0 {
                i64::from(page_no) >= page.total_pages
            } else {
                fetched < RECORDS_PER_PAGE as usize
            };
            if done {
                break;
            }
            page_no += 1;
        }
        Ok(Some(records))
    }
}
