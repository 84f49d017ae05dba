use std::sync::{
    atomic::{AtomicU64, Ordering},
    PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{DocumentStore, StoreError};
use crate::domain::{Company, DeviceScan, Machine, PendingUser, SensorReading, User, UserUpdate};
use crate::window::QueryWindow;

#[derive(Debug, Default)]
struct Collections {
    readings: Vec<SensorReading>,
    machines: Vec<Machine>,
    companies: Vec<Company>,
    users: Vec<User>,
    pending_users: Vec<PendingUser>,
    device_scans: Vec<DeviceScan>,
}

/// In-process document store with the same query semantics as the
/// PostgreSQL store. Used for fixtures and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<Collections>,
    next_pending_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Collections> {
        self.collections.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Collections> {
        self.collections.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_readings(&self, readings: impl IntoIterator<Item = SensorReading>) {
        self.write().readings.extend(readings);
    }

    pub fn insert_machine(&self, machine: Machine) {
        self.write().machines.push(machine);
    }

    pub fn insert_company(&self, company: Company) {
        self.write().companies.push(company);
    }

    pub fn insert_user(&self, user: User) {
        self.write().users.push(user);
    }

    pub fn insert_device_scan(&self, scan: DeviceScan) {
        self.write().device_scans.push(scan);
    }

    pub fn users(&self) -> Vec<User> {
        self.read().users.clone()
    }

    pub fn pending_users(&self) -> Vec<PendingUser> {
        self.read().pending_users.clone()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_readings(
        &self,
        machine_id: &str,
        window: &QueryWindow,
        limit: u32,
    ) -> Result<Vec<SensorReading>, StoreError> {
        let mut rows: Vec<SensorReading> = self
            .read()
            .readings
            .iter()
            .filter(|r| r.machine_id == machine_id && window.contains(r.ts))
            .cloned()
            .collect();

        rows.sort_by(|a, b| b.ts.cmp(&a.ts));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn fetch_machines(&self) -> Result<Vec<Machine>, StoreError> {
        Ok(self.read().machines.clone())
    }

    async fn fetch_companies(&self) -> Result<Vec<Company>, StoreError> {
        Ok(self.read().companies.clone())
    }

    async fn fetch_users_by_company(&self, company_code: &str) -> Result<Vec<User>, StoreError> {
        Ok(self
            .read()
            .users
            .iter()
            .filter(|u| u.company_code == company_code)
            .cloned()
            .collect())
    }

    async fn fetch_device_scans(&self) -> Result<Vec<DeviceScan>, StoreError> {
        Ok(self.read().device_scans.clone())
    }

    async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<(), StoreError> {
        let mut collections = self.write();
        let user = collections
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::NotFound {
                collection: "users",
                id: user_id.to_string(),
            })?;
        update.apply_to(user);
        Ok(())
    }

    async fn move_user_to_pending(&self, user: &User) -> Result<PendingUser, StoreError> {
        let n = self.next_pending_id.fetch_add(1, Ordering::Relaxed) + 1;
        let pending = PendingUser::from_user(user, format!("pending-{n}"), OffsetDateTime::now_utc());

        let mut collections = self.write();
        collections.pending_users.push(pending.clone());
        collections.users.retain(|u| u.id != user.id);
        Ok(pending)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), StoreError> {
        self.write().users.retain(|u| u.id != user_id);
        Ok(())
    }
}
