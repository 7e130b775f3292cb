use sqlx::SqliteConnection;

use crate::{db_types::Capability, traits::StoreError};

pub async fn has_permission(
    org_id: i64,
    user_id: i64,
    capability: Capability,
    conn: &mut SqliteConnection,
) -> Result<bool, StoreError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM org_permissions WHERE org_id = $1 AND user_id = $2 AND capability = $3",
    )
    .bind(org_id)
    .bind(user_id)
    .bind(capability)
    .fetch_one(conn)
    .await?;
    Ok(count > 0)
}

pub async fn grant_permission(
    org_id: i64,
    user_id: i64,
    capability: Capability,
    conn: &mut SqliteConnection,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO org_permissions (org_id, user_id, capability) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(org_id)
    .bind(user_id)
    .bind(capability)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn revoke_permission(
    org_id: i64,
    user_id: i64,
    capability: Capability,
    conn: &mut SqliteConnection,
) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM org_permissions WHERE org_id = $1 AND user_id = $2 AND capability = $3")
        .bind(org_id)
        .bind(user_id)
        .bind(capability)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
