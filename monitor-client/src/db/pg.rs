use async_trait::async_trait;
use sqlx::PgPool;

use super::{registry_queries, sensor_history_queries, DocumentStore, StoreError};
use crate::domain::{Company, DeviceScan, Machine, PendingUser, SensorReading, User, UserUpdate};
use crate::window::QueryWindow;

/// PostgreSQL-backed document store. Schema lives in `sql/schema.sql`.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn fetch_readings(
        &self,
        machine_id: &str,
        window: &QueryWindow,
        limit: u32,
    ) -> Result<Vec<SensorReading>, StoreError> {
        sensor_history_queries::fetch_readings(&self.pool, machine_id, window, limit).await
    }

    async fn fetch_machines(&self) -> Result<Vec<Machine>, StoreError> {
        registry_queries::machines(&self.pool).await
    }

    async fn fetch_companies(&self) -> Result<Vec<Company>, StoreError> {
        registry_queries::companies(&self.pool).await
    }

    async fn fetch_users_by_company(&self, company_code: &str) -> Result<Vec<User>, StoreError> {
        registry_queries::users_by_company(&self.pool, company_code).await
    }

    async fn fetch_device_scans(&self) -> Result<Vec<DeviceScan>, StoreError> {
        registry_queries::device_scans(&self.pool).await
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<(), StoreError> {
        registry_queries::update_user(&self.pool, user_id, update).await
    }

    async fn move_user_to_pending(&self, user: &User) -> Result<PendingUser, StoreError> {
        registry_queries::move_user_to_pending(&self.pool, user).await
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), StoreError> {
        registry_queries::delete_user(&self.pool, user_id).await
    }
}
