use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use monitor_client::{
    domain::SensorReading,
    window::{build_window, clamp_to_date, QueryWindow},
    DocumentStore, StoreError,
};
use serde::{Deserialize, Serialize};
use time::{Date, UtcOffset};

use crate::{
    alerts::{evaluate, Evaluation},
    config::HistoryConfig,
    filter::{filter_valid, MetricKind},
};

#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("no machine selected")]
    NoMachine,
    #[error("failed to fetch readings for machine '{machine_id}': {source}")]
    Fetch {
        machine_id: String,
        #[source]
        source: StoreError,
    },
}

/// Selection state for a machine-history view, passed explicitly on every load.
///
/// Editing the range through the `with_*_date` builders keeps `to_date` from
/// falling before `from_date`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryFilter {
    pub company_code: Option<String>,
    pub machine_id: Option<String>,
    pub quick_date: Option<Date>,
    pub from_date: Option<Date>,
    pub to_date: Option<Date>,
    pub metric: MetricKind,
    pub offset: UtcOffset,
}

impl HistoryFilter {
    pub fn new(offset: UtcOffset) -> Self {
        Self {
            company_code: None,
            machine_id: None,
            quick_date: None,
            from_date: None,
            to_date: None,
            metric: MetricKind::default(),
            offset,
        }
    }

    pub fn with_company(mut self, company_code: Option<String>) -> Self {
        self.company_code = company_code;
        self
    }

    pub fn with_machine(mut self, machine_id: impl Into<String>) -> Self {
        self.machine_id = Some(machine_id.into());
        self
    }

    pub fn with_quick_date(mut self, day: Option<Date>) -> Self {
        self.quick_date = day;
        self
    }

    pub fn with_from_date(mut self, from: Option<Date>) -> Self {
        self.from_date = from;
        self.to_date = clamp_to_date(self.from_date, self.to_date);
        self
    }

    pub fn with_to_date(mut self, to: Option<Date>) -> Self {
        self.to_date = clamp_to_date(self.from_date, to);
        self
    }

    pub fn with_metric(mut self, metric: MetricKind) -> Self {
        self.metric = metric;
        self
    }

    pub fn window(&self) -> QueryWindow {
        build_window(self.quick_date, self.from_date, self.to_date, self.offset)
    }
}

/// Implicit load on machine selection, or an explicit "apply filters" action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    #[default]
    Initial,
    ApplyFilters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub initial: u32,
    pub apply: u32,
}

impl HistoryLimits {
    pub fn for_mode(&self, mode: FetchMode) -> u32 {
        match mode {
            FetchMode::Initial => self.initial,
            FetchMode::ApplyFilters => self.apply,
        }
    }
}

impl From<&HistoryConfig> for HistoryLimits {
    fn from(cfg: &HistoryConfig) -> Self {
        Self {
            initial: cfg.initial_limit,
            apply: cfg.apply_limit,
        }
    }
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self::from(&HistoryConfig::default())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub machine_id: String,
    pub metric: MetricKind,
    pub window: QueryWindow,
    /// Rows returned by the store, valid or not.
    pub total_records: usize,
    /// Rows valid for `metric`; `readings` holds exactly these.
    pub valid_records: usize,
    /// Valid readings, oldest first.
    pub readings: Vec<SensorReading>,
    pub evaluation: Evaluation,
}

/// Assembles a view from a newest-first fetch result.
///
/// The set is filtered by the active metric only, while the evaluation
/// averages every metric family over that filtered set.
pub fn build_view(
    machine_id: &str,
    window: QueryWindow,
    mut newest_first: Vec<SensorReading>,
    metric: MetricKind,
) -> HistoryView {
    newest_first.reverse();
    let chronological = newest_first;

    let total_records = chronological.len();
    let readings = filter_valid(&chronological, metric);
    let evaluation = evaluate(&readings);

    HistoryView {
        machine_id: machine_id.to_string(),
        metric,
        window,
        total_records,
        valid_records: readings.len(),
        readings,
        evaluation,
    }
}

/// Runs one history query and evaluates the result. No retries.
pub async fn load_history(
    store: &dyn DocumentStore,
    filter: &HistoryFilter,
    limits: HistoryLimits,
    mode: FetchMode,
) -> Result<HistoryView, HistoryError> {
    let machine_id = filter.machine_id.as_deref().ok_or(HistoryError::NoMachine)?;
    let window = filter.window();
    let limit = limits.for_mode(mode);

    let rows = match store.fetch_readings(machine_id, &window, limit).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!(error = %e, machine_id, "sensor history fetch failed");
            metrics::counter!("history_fetch_failures_total").increment(1);
            return Err(HistoryError::Fetch {
                machine_id: machine_id.to_string(),
                source: e,
            });
        }
    };

    tracing::debug!(
        machine_id,
        rows = rows.len(),
        limit,
        metric = %filter.metric,
        "sensor history fetched"
    );

    Ok(build_view(machine_id, window, rows, filter.metric))
}

#[derive(Debug)]
pub enum LoadOutcome {
    Current(HistoryView),
    /// A newer load started while this one was in flight; its result was dropped.
    Stale { generation: u64 },
}

/// Issues history loads for one view, keeping only the most recently started.
///
/// Superseded loads are not cancelled; whatever they return is discarded.
pub struct HistoryLoader {
    store: Arc<dyn DocumentStore>,
    limits: HistoryLimits,
    generation: AtomicU64,
}

impl HistoryLoader {
    pub fn new(store: Arc<dyn DocumentStore>, limits: HistoryLimits) -> Self {
        Self {
            store,
            limits,
            generation: AtomicU64::new(0),
        }
    }

    pub async fn load(
        &self,
        filter: &HistoryFilter,
        mode: FetchMode,
    ) -> Result<LoadOutcome, HistoryError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = load_history(self.store.as_ref(), filter, self.limits, mode).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            metrics::counter!("history_stale_loads_total").increment(1);
            tracing::debug!(generation, "discarding superseded history load");
            return Ok(LoadOutcome::Stale { generation });
        }

        result.map(LoadOutcome::Current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use monitor_client::{
        domain::{Company, DeviceScan, Machine, PendingUser, User, UserUpdate},
        MemoryStore,
    };
    use time::{
        macros::{date, datetime},
        Duration, OffsetDateTime,
    };
    use tokio::sync::Notify;

    fn reading(machine_id: &str, ts: OffsetDateTime, temperature: f64, rms: f64) -> SensorReading {
        SensorReading {
            id: format!("{machine_id}-{}", ts.unix_timestamp()),
            machine_id: machine_id.to_string(),
            ts,
            temperature: Some(temperature),
            rms_vibration: Some(rms),
            vibration_velocity: None,
            alarm: Some("NORMAL".to_string()),
            free_heap: None,
            wifi_rssi: None,
            image_url: None,
        }
    }

    /// Delegates to a memory store; fetches for `gated_machine` wait for `gate`
    /// and fetches for `failing_machine` error out.
    struct TestStore {
        inner: MemoryStore,
        gate: Notify,
        gated_machine: Option<String>,
        failing_machine: Option<String>,
    }

    impl TestStore {
        fn new(inner: MemoryStore) -> Self {
            Self {
                inner,
                gate: Notify::new(),
                gated_machine: None,
                failing_machine: None,
            }
        }
    }

    #[async_trait]
    impl DocumentStore for TestStore {
        async fn fetch_readings(
            &self,
            machine_id: &str,
            window: &QueryWindow,
            limit: u32,
        ) -> Result<Vec<SensorReading>, StoreError> {
            if self.failing_machine.as_deref() == Some(machine_id) {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            if self.gated_machine.as_deref() == Some(machine_id) {
                self.gate.notified().await;
            }
            self.inner.fetch_readings(machine_id, window, limit).await
        }

        async fn fetch_machines(&self) -> Result<Vec<Machine>, StoreError> {
            self.inner.fetch_machines().await
        }

        async fn fetch_companies(&self) -> Result<Vec<Company>, StoreError> {
            self.inner.fetch_companies().await
        }

        async fn fetch_users_by_company(&self, company_code: &str) -> Result<Vec<User>, StoreError> {
            self.inner.fetch_users_by_company(company_code).await
        }

        async fn fetch_device_scans(&self) -> Result<Vec<DeviceScan>, StoreError> {
            self.inner.fetch_device_scans().await
        }

        async fn update_user(&self, user_id: &str, update: &UserUpdate) -> Result<(), StoreError> {
            self.inner.update_user(user_id, update).await
        }

        async fn move_user_to_pending(&self, user: &User) -> Result<PendingUser, StoreError> {
            self.inner.move_user_to_pending(user).await
        }

        async fn delete_user(&self, user_id: &str) -> Result<(), StoreError> {
            self.inner.delete_user(user_id).await
        }
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        let base = datetime!(2024-01-10 08:00:00 UTC);
        store.insert_readings((0..150).map(|i| reading("m-1", base + Duration::minutes(i), 20.0, 1.0)));
        store.insert_readings([
            reading("m-2", datetime!(2024-01-04 10:00:00 UTC), 10.0, 0.0),
            reading("m-2", datetime!(2024-01-05 10:00:00 UTC), 0.0, 2.0),
            reading("m-2", datetime!(2024-01-06 10:00:00 UTC), 20.0, 0.0),
            reading("m-2", datetime!(2024-01-08 10:00:00 UTC), 50.0, 0.0),
        ]);
        store
    }

    #[test]
    fn editing_dates_never_inverts_the_range() {
        let filter = HistoryFilter::new(UtcOffset::UTC)
            .with_to_date(Some(date!(2024 - 01 - 03)))
            .with_from_date(Some(date!(2024 - 01 - 05)));
        assert_eq!(filter.to_date, Some(date!(2024 - 01 - 05)));

        let filter = filter.with_to_date(Some(date!(2024 - 01 - 01)));
        assert_eq!(filter.to_date, Some(date!(2024 - 01 - 05)));
    }

    #[test]
    fn view_is_chronological_and_counts_invalid_rows() {
        let newest_first = vec![
            reading("m-1", datetime!(2024-01-03 00:00:00 UTC), 0.0, 5.0),
            reading("m-1", datetime!(2024-01-02 00:00:00 UTC), 20.0, 0.0),
            reading("m-1", datetime!(2024-01-01 00:00:00 UTC), 10.0, 0.0),
        ];

        let view = build_view("m-1", QueryWindow::unbounded(), newest_first.clone(), MetricKind::Temperature);
        assert_eq!(view.total_records, 3);
        assert_eq!(view.valid_records, 2);
        assert_eq!(view.readings[0].ts, datetime!(2024-01-01 00:00:00 UTC));
        assert_eq!(view.evaluation.averages.temperature, 15.0);
        assert_eq!(
            view.evaluation.latest.as_ref().map(|r| r.ts),
            Some(datetime!(2024-01-02 00:00:00 UTC))
        );

        // Switching to vibration changes which rows count as valid.
        let view = build_view("m-1", QueryWindow::unbounded(), newest_first, MetricKind::Vibration);
        assert_eq!(view.total_records, 3);
        assert_eq!(view.valid_records, 1);
        assert_eq!(view.evaluation.averages.temperature, 0.0);
        assert_eq!(view.evaluation.averages.rms_vibration, 5.0);
    }

    #[tokio::test]
    async fn limits_follow_fetch_mode() {
        let store = seeded_store();
        let filter = HistoryFilter::new(UtcOffset::UTC).with_machine("m-1");

        let initial = load_history(&store, &filter, HistoryLimits::default(), FetchMode::Initial)
            .await
            .unwrap();
        assert_eq!(initial.total_records, 100);
        // Newest rows are kept.
        assert_eq!(
            initial.readings.last().map(|r| r.ts),
            Some(datetime!(2024-01-10 08:00:00 UTC) + Duration::minutes(149))
        );

        let applied = load_history(&store, &filter, HistoryLimits::default(), FetchMode::ApplyFilters)
            .await
            .unwrap();
        assert_eq!(applied.total_records, 150);
    }

    #[tokio::test]
    async fn range_query_feeds_alert_evaluation() {
        let store = seeded_store();
        let filter = HistoryFilter::new(UtcOffset::UTC)
            .with_machine("m-2")
            .with_from_date(Some(date!(2024 - 01 - 04)))
            .with_to_date(Some(date!(2024 - 01 - 08)));

        let view = load_history(&store, &filter, HistoryLimits::default(), FetchMode::ApplyFilters)
            .await
            .unwrap();

        assert_eq!(view.total_records, 4);
        assert_eq!(view.valid_records, 3);
        // (10 + 20 + 50) / 3
        assert!((view.evaluation.averages.temperature - 80.0 / 3.0).abs() < 1e-9);
        assert_eq!(view.evaluation.alert_level, crate::alerts::AlertLevel::Mid);
    }

    #[tokio::test]
    async fn quick_date_overrides_range() {
        let store = seeded_store();
        let filter = HistoryFilter::new(UtcOffset::UTC)
            .with_machine("m-2")
            .with_from_date(Some(date!(2024 - 01 - 04)))
            .with_to_date(Some(date!(2024 - 01 - 08)))
            .with_quick_date(Some(date!(2024 - 01 - 06)));

        let view = load_history(&store, &filter, HistoryLimits::default(), FetchMode::ApplyFilters)
            .await
            .unwrap();

        assert_eq!(view.total_records, 1);
        assert_eq!(view.evaluation.averages.temperature, 20.0);
    }

    #[tokio::test]
    async fn missing_machine_is_an_error() {
        let store = seeded_store();
        let filter = HistoryFilter::new(UtcOffset::UTC);

        let err = load_history(&store, &filter, HistoryLimits::default(), FetchMode::Initial)
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::NoMachine));
    }

    #[tokio::test]
    async fn fetch_failure_is_surfaced() {
        let mut store = TestStore::new(seeded_store());
        store.failing_machine = Some("m-1".to_string());
        let loader = HistoryLoader::new(Arc::new(store), HistoryLimits::default());
        let filter = HistoryFilter::new(UtcOffset::UTC).with_machine("m-1");

        let err = loader.load(&filter, FetchMode::Initial).await.unwrap_err();
        assert!(matches!(err, HistoryError::Fetch { ref machine_id, .. } if machine_id == "m-1"));
    }

    #[tokio::test]
    async fn superseded_load_is_discarded() {
        let mut store = TestStore::new(seeded_store());
        store.gated_machine = Some("m-1".to_string());
        let store = Arc::new(store);
        let loader = HistoryLoader::new(store.clone(), HistoryLimits::default());

        let slow = HistoryFilter::new(UtcOffset::UTC).with_machine("m-1");
        let fast = HistoryFilter::new(UtcOffset::UTC).with_machine("m-2");

        let (first, second) = tokio::join!(loader.load(&slow, FetchMode::Initial), async {
            let outcome = loader.load(&fast, FetchMode::Initial).await;
            store.gate.notify_one();
            outcome
        });

        assert!(matches!(first.unwrap(), LoadOutcome::Stale { generation: 1 }));
        match second.unwrap() {
            LoadOutcome::Current(view) => assert_eq!(view.machine_id, "m-2"),
            other => panic!("expected current view, got {other:?}"),
        }
    }
}
