pub mod config;
pub mod error;
pub mod http;
pub mod images;
pub mod pocketbase;
pub mod seed;

pub use config::{ConfigOverrides, SeedConfig};
pub use error::SeedError;
pub use seed::{SeedReport, Seeder};

/// Run the whole seeding workflow against the configured backend
pub async fn run(config: SeedConfig) -> Result<SeedReport, SeedError> {
    Seeder::new(config)?.run().await
}
