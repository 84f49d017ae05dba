use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::StoreError;
use crate::domain::{Company, DeviceScan, Machine, PendingUser, User, UserUpdate};

pub async fn companies(pool: &PgPool) -> Result<Vec<Company>, StoreError> {
    let rows = sqlx::query_as::<_, Company>(
        r#"
        SELECT id, company_code, company_name, address, email, gst_no, mobile_no, user_type, created_at
        FROM companies
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn machines(pool: &PgPool) -> Result<Vec<Machine>, StoreError> {
    let rows = sqlx::query_as::<_, Machine>(
        r#"
        SELECT
            id,
            name,
            company,
            company_code,
            is_active,
            location,
            category,
            manufacturer_model,
            commissioning_date,
            address,
            equipment_description,
            created_at
        FROM machines
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn users_by_company(pool: &PgPool, company_code: &str) -> Result<Vec<User>, StoreError> {
    let rows = sqlx::query_as::<_, User>(
        r#"
        SELECT id, company_code, company_id, department, email, full_name, mobile_no, user_type, created_at
        FROM users
        WHERE company_code = $1
        "#,
    )
    .bind(company_code)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn device_scans(pool: &PgPool) -> Result<Vec<DeviceScan>, StoreError> {
    let rows = sqlx::query_as::<_, DeviceScan>(
        r#"
        SELECT id, action, company, device_id, scanned_at, serial_number
        FROM device_data
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

pub async fn update_user(pool: &PgPool, user_id: &str, update: &UserUpdate) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE users SET
            full_name = COALESCE($2, full_name),
            department = COALESCE($3, department),
            mobile_no = COALESCE($4, mobile_no),
            user_type = COALESCE($5, user_type)
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(&update.full_name)
    .bind(&update.department)
    .bind(&update.mobile_no)
    .bind(&update.user_type)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound {
            collection: "users",
            id: user_id.to_string(),
        });
    }
    Ok(())
}

/// Insert the pending copy and drop the verified user in one transaction.
pub async fn move_user_to_pending(pool: &PgPool, user: &User) -> Result<PendingUser, StoreError> {
    let now = OffsetDateTime::now_utc();
    let mut tx = pool.begin().await?;

    let pending = sqlx::query_as::<_, PendingUser>(
        r#"
        INSERT INTO pending_users
            (id, company_code, department, email, full_name, mobile_no, status, user_type, created_at)
        VALUES (gen_random_uuid()::text, $1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, company_code, department, email, full_name, mobile_no, status, user_type, created_at
        "#,
    )
    .bind(&user.company_code)
    .bind(&user.department)
    .bind(&user.email)
    .bind(&user.full_name)
    .bind(&user.mobile_no)
    .bind(crate::domain::PENDING_VERIFICATION)
    .bind(user.user_type.as_deref().unwrap_or("user"))
    .bind(user.created_at.unwrap_or(now))
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(&user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(pending)
}

pub async fn delete_user(pool: &PgPool, user_id: &str) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}
