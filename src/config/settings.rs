use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::images::PlaceholderSpec;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8090";

/// Effective configuration for one seeding run
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SeedConfig {
    pub base_url: String,
    pub admin: AdminCredentials,
    pub user: SeedUser,
    pub output_dir: PathBuf,
    /// Delete the seed user's existing images before uploading
    pub cleanup: bool,
    /// Upload plan, oldest first
    pub images: Vec<PlaceholderSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            admin: AdminCredentials::default(),
            user: SeedUser::default(),
            output_dir: PathBuf::from("."),
            cleanup: true,
            images: PlaceholderSpec::default_plan(),
            timeout_secs: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AdminCredentials {
    pub identity: String,
    pub password: String,
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            identity: "admin@local.host".to_string(),
            password: "password123".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SeedUser {
    pub email: String,
    pub password: String,
    pub preferences: SlideshowPreferences,
}

impl Default for SeedUser {
    fn default() -> Self {
        Self {
            email: "display@frame.local".to_string(),
            password: "testPassword123".to_string(),
            preferences: SlideshowPreferences::default(),
        }
    }
}

/// Slideshow fields stored on the user record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SlideshowPreferences {
    pub slideshow_portrait_pair: bool,
    pub slideshow_order: SlideshowOrder,
    /// Seconds per slide
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slideshow_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slideshow_fit: Option<SlideshowFit>,
}

impl Default for SlideshowPreferences {
    fn default() -> Self {
        Self {
            slideshow_portrait_pair: true,
            slideshow_order: SlideshowOrder::Newest,
            slideshow_interval: None,
            slideshow_fit: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlideshowOrder {
    Newest,
    Oldest,
    Random,
    RandomDaily,
    RandomHourly,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlideshowFit {
    Cover,
    Contain,
}
