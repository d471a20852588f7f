//! PostgreSQL store adapters
//!
//! Records are kept in one `data_items` table with the field map in a JSONB
//! column; shares in `data_shares`. Both adapters use runtime-checked
//! queries so the crate builds without a live database.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PgDataStore;
//! use std::sync::Arc;
//!
//! let store: Arc<dyn DataStore> = Arc::new(PgDataStore::new(pool));
//! let item = store.get("Country", id).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable};
use core_kernel::{
    DataItem, DataStore, ItemId, PermissionLevel, PortError, Share, ShareId, SharePort,
    ShareTarget, StoreWrite,
};

use crate::error::DatabaseError;

/// Database row for a stored record
#[derive(Debug, Clone, FromRow)]
pub struct DataItemRow {
    pub id: Uuid,
    pub data_type: String,
    pub version: i64,
    pub fields: Json<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DataItemRow> for DataItem {
    fn from(row: DataItemRow) -> Self {
        DataItem {
            id: ItemId::from_uuid(row.id),
            data_type: row.data_type,
            version: row.version,
            fields: row.fields.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ITEM_COLUMNS: &str = "id, data_type, version, fields, created_at, updated_at";

async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool).await;

    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: Utc::now(),
        },
        Err(e) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(format!("Database error: {}", e)),
            checked_at: Utc::now(),
        },
    }
}

fn db_error(error: sqlx::Error) -> PortError {
    DatabaseError::from(error).into()
}

async fn insert_row(conn: &mut PgConnection, item: &DataItem) -> Result<DataItem, PortError> {
    let row = sqlx::query_as::<_, DataItemRow>(&format!(
        "INSERT INTO data_items (id, data_type, version, fields, created_at, updated_at) \
         VALUES ($1, $2, 0, $3, now(), now()) RETURNING {}",
        ITEM_COLUMNS
    ))
    .bind(*item.id.as_uuid())
    .bind(&item.data_type)
    .bind(Json(&item.fields))
    .fetch_one(&mut *conn)
    .await
    .map_err(db_error)?;

    Ok(row.into())
}

/// Compare-and-set on `version`; a missed row is told apart as stale or gone
async fn update_row(conn: &mut PgConnection, item: &DataItem) -> Result<DataItem, PortError> {
    let row = sqlx::query_as::<_, DataItemRow>(&format!(
        "UPDATE data_items SET fields = $3, version = version + 1, updated_at = now() \
         WHERE data_type = $1 AND id = $2 AND version = $4 RETURNING {}",
        ITEM_COLUMNS
    ))
    .bind(&item.data_type)
    .bind(*item.id.as_uuid())
    .bind(Json(&item.fields))
    .bind(item.version)
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error)?;

    if let Some(row) = row {
        return Ok(row.into());
    }

    let current = sqlx::query_scalar::<_, i64>(
        "SELECT version FROM data_items WHERE data_type = $1 AND id = $2",
    )
    .bind(&item.data_type)
    .bind(*item.id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error)?;

    match current {
        Some(current) => Err(PortError::conflict(format!(
            "{} '{}' was modified (version {} is stale, current is {})",
            item.data_type, item.id, item.version, current
        ))),
        None => Err(PortError::not_found(item.data_type.clone(), item.id)),
    }
}

async fn delete_row(conn: &mut PgConnection, data_type: &str, id: ItemId) -> Result<bool, PortError> {
    let result = sqlx::query("DELETE FROM data_items WHERE data_type = $1 AND id = $2")
        .bind(data_type)
        .bind(*id.as_uuid())
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;

    Ok(result.rows_affected() > 0)
}

/// PostgreSQL-backed implementation of [`DataStore`]
#[derive(Debug, Clone)]
pub struct PgDataStore {
    pool: PgPool,
}

impl PgDataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DomainPort for PgDataStore {}

#[async_trait]
impl HealthCheckable for PgDataStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-data-store").await
    }
}

#[async_trait]
impl DataStore for PgDataStore {
    #[instrument(skip(self))]
    async fn get(&self, data_type: &str, id: ItemId) -> Result<Option<DataItem>, PortError> {
        let row = sqlx::query_as::<_, DataItemRow>(&format!(
            "SELECT {} FROM data_items WHERE data_type = $1 AND id = $2",
            ITEM_COLUMNS
        ))
        .bind(data_type)
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(DataItem::from))
    }

    #[instrument(skip(self))]
    async fn list(&self, data_type: &str) -> Result<Vec<DataItem>, PortError> {
        let rows = sqlx::query_as::<_, DataItemRow>(&format!(
            "SELECT {} FROM data_items WHERE data_type = $1 ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(data_type)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        debug!(count = rows.len(), "Listed records");
        Ok(rows.into_iter().map(DataItem::from).collect())
    }

    #[instrument(skip(self, value))]
    async fn find_by_field(
        &self,
        data_type: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<DataItem>, PortError> {
        let rows = sqlx::query_as::<_, DataItemRow>(&format!(
            "SELECT {} FROM data_items WHERE data_type = $1 AND fields -> $2 = $3 ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(data_type)
        .bind(field)
        .bind(Json(value))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(DataItem::from).collect())
    }

    async fn count(&self, data_type: &str) -> Result<usize, PortError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM data_items WHERE data_type = $1")
            .bind(data_type)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(count.max(0) as usize)
    }

    #[instrument(skip(self, item), fields(data_type = %item.data_type, id = %item.id))]
    async fn insert(&self, item: DataItem) -> Result<DataItem, PortError> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let stored = insert_row(&mut conn, &item).await?;
        debug!("Inserted record");
        Ok(stored)
    }

    #[instrument(skip(self, item), fields(data_type = %item.data_type, id = %item.id))]
    async fn update(&self, item: DataItem) -> Result<DataItem, PortError> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let stored = update_row(&mut conn, &item).await?;
        debug!(version = stored.version, "Updated record");
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn delete(&self, data_type: &str, id: ItemId) -> Result<bool, PortError> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        delete_row(&mut conn, data_type, id).await
    }

    #[instrument(skip(self, writes), fields(writes = writes.len()))]
    async fn apply(&self, writes: Vec<StoreWrite>) -> Result<(), PortError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // An early return drops `tx`, which rolls the batch back
        for write in &writes {
            match write {
                StoreWrite::Insert(item) => {
                    insert_row(&mut tx, item).await?;
                }
                StoreWrite::Update(item) => {
                    update_row(&mut tx, item).await?;
                }
                StoreWrite::Delete { data_type, id } => {
                    delete_row(&mut tx, data_type, *id).await?;
                }
            }
        }

        tx.commit().await.map_err(db_error)?;
        debug!("Applied batch");
        Ok(())
    }

    async fn get_many(&self, data_type: &str, ids: &[ItemId]) -> Result<Vec<DataItem>, PortError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, DataItemRow>(&format!(
            "SELECT {} FROM data_items WHERE data_type = $1 AND id = ANY($2) ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(data_type)
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(DataItem::from).collect())
    }
}

/// Database row for a share
#[derive(Debug, Clone, FromRow)]
pub struct ShareRow {
    pub id: Uuid,
    pub target_kind: String,
    pub target_name: Option<String>,
    pub data_type: String,
    pub level: String,
    pub item_id: Option<Uuid>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ShareRow> for Share {
    type Error = PortError;

    fn try_from(row: ShareRow) -> Result<Self, Self::Error> {
        let target = match (row.target_kind.as_str(), row.target_name) {
            ("all", _) => ShareTarget::All,
            ("group", Some(name)) => ShareTarget::Group(name),
            ("user", Some(name)) => ShareTarget::User(name),
            (kind, _) => {
                return Err(PortError::internal(format!("invalid share target '{}'", kind)))
            }
        };
        let level: PermissionLevel = row
            .level
            .parse()
            .map_err(|_| PortError::internal(format!("invalid share level '{}'", row.level)))?;

        Ok(Share {
            id: ShareId::from_uuid(row.id),
            target,
            data_type: row.data_type,
            level,
            item: row.item_id.map(ItemId::from_uuid),
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

fn target_columns(target: &ShareTarget) -> (&'static str, Option<&str>) {
    match target {
        ShareTarget::All => ("all", None),
        ShareTarget::Group(name) => ("group", Some(name.as_str())),
        ShareTarget::User(name) => ("user", Some(name.as_str())),
    }
}

const SHARE_COLUMNS: &str =
    "id, target_kind, target_name, data_type, level, item_id, created_by, created_at";

/// PostgreSQL-backed implementation of [`SharePort`]
#[derive(Debug, Clone)]
pub struct PgShareStore {
    pool: PgPool,
}

impl PgShareStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn delete_grant(
        &self,
        executor: &mut sqlx::PgConnection,
        target: &ShareTarget,
        data_type: &str,
        item: Option<ItemId>,
    ) -> Result<u64, sqlx::Error> {
        let (kind, name) = target_columns(target);
        let result = sqlx::query(
            "DELETE FROM data_shares WHERE target_kind = $1 \
             AND target_name IS NOT DISTINCT FROM $2 AND data_type = $3 \
             AND item_id IS NOT DISTINCT FROM $4",
        )
        .bind(kind)
        .bind(name)
        .bind(data_type)
        .bind(item.map(|id| *id.as_uuid()))
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}

impl DomainPort for PgShareStore {}

#[async_trait]
impl HealthCheckable for PgShareStore {
    async fn health_check(&self) -> HealthCheckResult {
        ping(&self.pool, "postgres-share-store").await
    }
}

#[async_trait]
impl SharePort for PgShareStore {
    #[instrument(skip(self, share), fields(grantee = %share.target, data_type = %share.data_type))]
    async fn upsert(&self, share: Share) -> Result<Share, PortError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        self.delete_grant(&mut tx, &share.target, &share.data_type, share.item)
            .await
            .map_err(db_error)?;

        let (kind, name) = target_columns(&share.target);
        let row = sqlx::query_as::<_, ShareRow>(&format!(
            "INSERT INTO data_shares (id, target_kind, target_name, data_type, level, item_id, created_by, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {}",
            SHARE_COLUMNS
        ))
        .bind(*share.id.as_uuid())
        .bind(kind)
        .bind(name)
        .bind(&share.data_type)
        .bind(share.level.as_str())
        .bind(share.item.map(|id| *id.as_uuid()))
        .bind(&share.created_by)
        .bind(share.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        debug!("Stored share");
        row.try_into()
    }

    #[instrument(skip(self))]
    async fn remove(
        &self,
        target: &ShareTarget,
        data_type: &str,
        item: Option<ItemId>,
    ) -> Result<bool, PortError> {
        let mut conn = self.pool.acquire().await.map_err(db_error)?;
        let removed = self
            .delete_grant(&mut conn, target, data_type, item)
            .await
            .map_err(db_error)?;
        Ok(removed > 0)
    }

    async fn list_for_type(
        &self,
        data_type: &str,
        item: Option<ItemId>,
    ) -> Result<Vec<Share>, PortError> {
        let rows = sqlx::query_as::<_, ShareRow>(&format!(
            "SELECT {} FROM data_shares WHERE data_type = $1 \
             AND ($2::uuid IS NULL OR item_id = $2) ORDER BY created_at",
            SHARE_COLUMNS
        ))
        .bind(data_type)
        .bind(item.map(|id| *id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Share::try_from).collect()
    }

    async fn list_for_principal(&self, user: &str, groups: &[String]) -> Result<Vec<Share>, PortError> {
        let rows = sqlx::query_as::<_, ShareRow>(&format!(
            "SELECT {} FROM data_shares WHERE target_kind = 'all' \
             OR (target_kind = 'user' AND target_name = $1) \
             OR (target_kind = 'group' AND target_name = ANY($2)) ORDER BY created_at",
            SHARE_COLUMNS
        ))
        .bind(user)
        .bind(groups)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(Share::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn share_row(kind: &str, name: Option<&str>, level: &str) -> ShareRow {
        ShareRow {
            id: Uuid::new_v4(),
            target_kind: kind.to_string(),
            target_name: name.map(str::to_string),
            data_type: "Country".to_string(),
            level: level.to_string(),
            item_id: None,
            created_by: "admin".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_share_row_conversion() {
        let share = Share::try_from(share_row("group", Some("pilots"), "edit")).unwrap();
        assert_eq!(share.target, ShareTarget::Group("pilots".into()));
        assert_eq!(share.level, PermissionLevel::Edit);

        assert!(Share::try_from(share_row("group", None, "edit")).is_err());
        assert!(Share::try_from(share_row("all", None, "owner")).is_err());
    }

    #[test]
    fn test_item_row_conversion() {
        let mut fields = Map::new();
        fields.insert("name".to_string(), Value::String("Chad".into()));
        let row = DataItemRow {
            id: Uuid::new_v4(),
            data_type: "Country".to_string(),
            version: 4,
            fields: Json(fields),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let item = DataItem::from(row);
        assert_eq!(item.version, 4);
        assert_eq!(item.field("name"), "Chad");
    }
}
