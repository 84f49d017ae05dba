mod memory;
mod pg;
pub mod registry_queries;
pub mod sensor_history_queries;

use async_trait::async_trait;

use crate::domain::{Company, DeviceScan, Machine, PendingUser, SensorReading, User, UserUpdate};
use crate::window::QueryWindow;

pub use memory::MemoryStore;
pub use pg::PgDocumentStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{collection} document '{id}' not found")]
    NotFound { collection: &'static str, id: String },
}

/// The document collections the dashboard reads and writes.
///
/// Every call is one independent query or mutation; implementations keep no
/// state between calls beyond the stored documents themselves.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Readings for one machine, newest first, bounded inclusively by `window`
    /// and capped at `limit` rows.
    async fn fetch_readings(
        &self,
        machine_id: &str,
        window: &QueryWindow,
        limit: u32,
    ) -> Result<Vec<SensorReading>, StoreError>;

    async fn fetch_machines(&self) -> Result<Vec<Machine>, StoreError>;

    async fn fetch_companies(&self) -> Result<Vec<Company>, StoreError>;

    async fn fetch_users_by_company(&self, company_code: &str) -> Result<Vec<User>, StoreError>;

    async fn fetch_device_scans(&self) -> Result<Vec<DeviceScan>, StoreError>;

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<(), StoreError>;

    /// Copies `user` into the pending queue and removes it from verified users.
    async fn move_user_to_pending(&self, user: &User) -> Result<PendingUser, StoreError>;

    /// Deleting a user that does not exist is not an error.
    async fn delete_user(&self, user_id: &str) -> Result<(), StoreError>;
}
