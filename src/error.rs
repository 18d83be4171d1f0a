// Error handling for slideshow-seed

use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;

/// Seeding error type
///
/// The first group of variants are "reported-and-abort" outcomes: the backend
/// answered, but with something that makes the rest of the run pointless.
/// The second group are local or transport faults.
#[derive(Debug)]
pub enum SeedError {
    AuthFailed { status: StatusCode, body: Value },
    SchemaLookupFailed { status: StatusCode, body: Value },
    CollectionMissing(String),
    FieldMissing { collection: String, field: String },
    UserLookupFailed { status: StatusCode, body: Value },
    UserCreationFailed { status: StatusCode, body: Value },
    Transport(String),
    MalformedResponse(String),
    Image(String),
    Io(String),
    Config(String),
}

impl SeedError {
    /// True for failures the backend reported through a response body.
    pub fn is_reported(&self) -> bool {
        matches!(
            self,
            SeedError::AuthFailed { .. }
                | SeedError::SchemaLookupFailed { .. }
                | SeedError::CollectionMissing(_)
                | SeedError::FieldMissing { .. }
                | SeedError::UserLookupFailed { .. }
                | SeedError::UserCreationFailed { .. }
        )
    }
}

impl fmt::Display for SeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeedError::AuthFailed { status, body } => {
                write!(f, "Admin auth failed ({}): {}", status, body)
            }
            SeedError::SchemaLookupFailed { status, body } => {
                write!(f, "Listing collections failed ({}): {}", status, body)
            }
            SeedError::CollectionMissing(name) => {
                write!(f, "Collection '{}' not found", name)
            }
            SeedError::FieldMissing { collection, field } => write!(
                f,
                "Collection '{}' is missing the '{}' field, add a migration for it",
                collection, field
            ),
            SeedError::UserLookupFailed { status, body } => {
                write!(f, "User lookup failed ({}): {}", status, body)
            }
            SeedError::UserCreationFailed { status, body } => {
                write!(f, "Create user failed ({}): {}", status, body)
            }
            SeedError::Transport(msg) => write!(f, "Transport error: {}", msg),
            SeedError::MalformedResponse(msg) => write!(f, "Malformed response: {}", msg),
            SeedError::Image(msg) => write!(f, "Image error: {}", msg),
            SeedError::Io(msg) => write!(f, "I/O error: {}", msg),
            SeedError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for SeedError {}

impl From<std::io::Error> for SeedError {
    fn from(err: std::io::Error) -> Self {
        SeedError::Io(err.to_string())
    }
}

impl From<image::ImageError> for SeedError {
    fn from(err: image::ImageError) -> Self {
        SeedError::Image(err.to_string())
    }
}

// Extension trait for HTTP transport result handling
pub trait TransportResultExt<T> {
    /// Convert transport errors to SeedError::Transport with a context prefix
    fn transport_err(self, context: &str) -> Result<T, SeedError>;
}

impl<T, E: std::fmt::Display> TransportResultExt<T> for Result<T, E> {
    fn transport_err(self, context: &str) -> Result<T, SeedError> {
        self.map_err(|e| SeedError::Transport(format!("{}: {}", context, e)))
    }
}
