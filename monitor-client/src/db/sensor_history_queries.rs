use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::StoreError;
use crate::domain::SensorReading;
use crate::window::QueryWindow;

/// Fetch a machine's readings newest first, applying whichever window bounds
/// are set and capping the row count.
pub async fn fetch_readings(
    pool: &PgPool,
    machine_id: &str,
    window: &QueryWindow,
    limit: u32,
) -> Result<Vec<SensorReading>, StoreError> {
    let mut builder = QueryBuilder::<Postgres>::new(
        r#"
        SELECT
            id,
            machine_id,
            ts,
            temperature,
            rms_vibration,
            vibration_velocity,
            alarm,
            free_heap,
            wifi_rssi,
            image_url
        FROM sensor_history
        WHERE machine_id = "#,
    );
    builder.push_bind(machine_id);

    if let Some(from) = window.from {
        builder.push(" AND ts >= ").push_bind(from);
    }
    if let Some(to) = window.to {
        builder.push(" AND ts <= ").push_bind(to);
    }

    builder
        .push(" ORDER BY ts DESC LIMIT ")
        .push_bind(i64::from(limit));

    let rows = builder
        .build_query_as::<SensorReading>()
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
