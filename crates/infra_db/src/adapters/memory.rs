//! In-memory store adapters
//!
//! Records and shares live in `tokio::sync::RwLock`-guarded maps. These
//! adapters back the test suites and the demo server; they enforce the same
//! version and uniqueness rules as the PostgreSQL adapters.
//!
//! A batch is applied to staged copies of the tables it touches while the
//! write lock is held, and the copies replace the live tables only when
//! every write succeeded.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use core_kernel::ports::{DomainPort, HealthCheckResult, HealthCheckable};
use core_kernel::{
    DataItem, DataStore, ItemId, PortError, Share, SharePort, ShareTarget, StoreWrite,
};

/// Records keyed by data type, then id (ids are time-ordered, so iteration
/// follows insertion order for ids minted by the repository)
type Tables = HashMap<String, Table>;
type Table = BTreeMap<ItemId, DataItem>;

fn insert_into(table: &mut Table, mut item: DataItem) -> Result<DataItem, PortError> {
    if table.contains_key(&item.id) {
        return Err(PortError::conflict(format!(
            "{} with id '{}' already exists",
            item.data_type, item.id
        )));
    }
    let now = Utc::now();
    item.version = 0;
    item.created_at = now;
    item.updated_at = now;
    table.insert(item.id, item.clone());
    Ok(item)
}

fn update_in(table: &mut Table, item: DataItem) -> Result<DataItem, PortError> {
    let stored = table
        .get_mut(&item.id)
        .ok_or_else(|| PortError::not_found(item.data_type.clone(), item.id))?;

    if stored.version != item.version {
        return Err(PortError::conflict(format!(
            "{} '{}' was modified (version {} is stale, current is {})",
            item.data_type, item.id, item.version, stored.version
        )));
    }

    stored.fields = item.fields;
    stored.version += 1;
    stored.updated_at = Utc::now();
    Ok(stored.clone())
}

/// In-memory implementation of [`DataStore`]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates the store, keeping the given versions
    pub async fn with_items(items: Vec<DataItem>) -> Self {
        let store = Self::new();
        {
            let mut tables = store.tables.write().await;
            for item in items {
                tables
                    .entry(item.data_type.clone())
                    .or_default()
                    .insert(item.id, item);
            }
        }
        store
    }

    /// Number of records across all types
    pub async fn len(&self) -> usize {
        self.tables.read().await.values().map(BTreeMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl DomainPort for MemoryStore {}

#[async_trait]
impl HealthCheckable for MemoryStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-data-store")
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn get(&self, data_type: &str, id: ItemId) -> Result<Option<DataItem>, PortError> {
        let tables = self.tables.read().await;
        Ok(tables.get(data_type).and_then(|t| t.get(&id)).cloned())
    }

    async fn list(&self, data_type: &str) -> Result<Vec<DataItem>, PortError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(data_type)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn find_by_field(
        &self,
        data_type: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<DataItem>, PortError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(data_type)
            .map(|t| {
                t.values()
                    .filter(|item| item.fields.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count(&self, data_type: &str) -> Result<usize, PortError> {
        let tables = self.tables.read().await;
        Ok(tables.get(data_type).map(BTreeMap::len).unwrap_or(0))
    }

    #[instrument(skip(self, item), fields(data_type = %item.data_type, id = %item.id))]
    async fn insert(&self, item: DataItem) -> Result<DataItem, PortError> {
        let mut tables = self.tables.write().await;
        let stored = insert_into(tables.entry(item.data_type.clone()).or_default(), item)?;
        debug!("Inserted record");
        Ok(stored)
    }

    #[instrument(skip(self, item), fields(data_type = %item.data_type, id = %item.id))]
    async fn update(&self, item: DataItem) -> Result<DataItem, PortError> {
        let mut tables = self.tables.write().await;
        let table = tables
            .get_mut(&item.data_type)
            .ok_or_else(|| PortError::not_found(item.data_type.clone(), item.id))?;
        let stored = update_in(table, item)?;
        debug!(version = stored.version, "Updated record");
        Ok(stored)
    }

    #[instrument(skip(self))]
    async fn delete(&self, data_type: &str, id: ItemId) -> Result<bool, PortError> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .get_mut(data_type)
            .and_then(|t| t.remove(&id))
            .is_some();
        debug!(removed, "Deleted record");
        Ok(removed)
    }

    #[instrument(skip(self, writes), fields(writes = writes.len()))]
    async fn apply(&self, writes: Vec<StoreWrite>) -> Result<(), PortError> {
        let mut tables = self.tables.write().await;
        let mut staged = Tables::new();

        for write in writes {
            let table = staged
                .entry(write.data_type().to_string())
                .or_insert_with_key(|data_type| tables.get(data_type).cloned().unwrap_or_default());
            match write {
                StoreWrite::Insert(item) => {
                    insert_into(table, item)?;
                }
                StoreWrite::Update(item) => {
                    update_in(table, item)?;
                }
                StoreWrite::Delete { id, .. } => {
                    table.remove(&id);
                }
            }
        }

        debug!(tables = staged.len(), "Applied batch");
        tables.extend(staged);
        Ok(())
    }
}

/// In-memory implementation of [`SharePort`]
#[derive(Debug, Default, Clone)]
pub struct MemoryShareStore {
    shares: Arc<RwLock<Vec<Share>>>,
}

impl MemoryShareStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DomainPort for MemoryShareStore {}

#[async_trait]
impl HealthCheckable for MemoryShareStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy("memory-share-store")
    }
}

#[async_trait]
impl SharePort for MemoryShareStore {
    #[instrument(skip(self, share), fields(grantee = %share.target, data_type = %share.data_type))]
    async fn upsert(&self, share: Share) -> Result<Share, PortError> {
        let mut shares = self.shares.write().await;
        match shares.iter_mut().find(|s| s.same_grant(&share)) {
            Some(existing) => {
                existing.level = share.level;
                existing.created_by = share.created_by;
                existing.created_at = share.created_at;
                Ok(existing.clone())
            }
            None => {
                shares.push(share.clone());
                Ok(share)
            }
        }
    }

    async fn remove(
        &self,
        target: &ShareTarget,
        data_type: &str,
        item: Option<ItemId>,
    ) -> Result<bool, PortError> {
        let mut shares = self.shares.write().await;
        let before = shares.len();
        shares.retain(|s| !(&s.target == target && s.data_type == data_type && s.item == item));
        Ok(shares.len() != before)
    }

    async fn list_for_type(
        &self,
        data_type: &str,
        item: Option<ItemId>,
    ) -> Result<Vec<Share>, PortError> {
        let shares = self.shares.read().await;
        Ok(shares
            .iter()
            .filter(|s| s.data_type == data_type && (item.is_none() || s.item == item))
            .cloned()
            .collect())
    }

    async fn list_for_principal(&self, user: &str, groups: &[String]) -> Result<Vec<Share>, PortError> {
        let shares = self.shares.read().await;
        Ok(shares
            .iter()
            .filter(|s| s.target.includes(user, groups))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::PermissionLevel;
    use serde_json::{json, Map};

    fn item(data_type: &str, name: &str) -> DataItem {
        let mut fields = Map::new();
        fields.insert("name".to_string(), json!(name));
        DataItem::new(data_type, ItemId::new_v7(), fields)
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryStore::new();
        let record = item("Country", "Norway");
        store.insert(record.clone()).await.unwrap();
        let err = store.insert(record).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_checks_version() {
        let store = MemoryStore::new();
        let stored = store.insert(item("Country", "Norway")).await.unwrap();

        let mut first = stored.clone();
        first.set_field("name", json!("Norge"));
        let updated = store.update(first).await.unwrap();
        assert_eq!(updated.version, 1);

        let mut stale = stored;
        stale.set_field("name", json!("Noreg"));
        let err = store.update(stale).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = MemoryStore::new();
        let err = store.update(item("City", "Oslo")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_find_by_field_and_count() {
        let store = MemoryStore::new();
        store.insert(item("City", "Oslo")).await.unwrap();
        store.insert(item("City", "Bergen")).await.unwrap();
        store.insert(item("Country", "Oslo")).await.unwrap();

        let found = store.find_by_field("City", "name", &json!("Oslo")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.count("City").await.unwrap(), 2);
        assert_eq!(store.count("Leader").await.unwrap(), 0);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_apply_writes_whole_batch() {
        let store = MemoryStore::new();
        let country = store.insert(item("Country", "Norway")).await.unwrap();
        let city = item("City", "Oslo");
        let city_id = city.id;

        let mut renamed = country.clone();
        renamed.set_field("name", json!("Norge"));
        store
            .apply(vec![StoreWrite::Update(renamed), StoreWrite::Insert(city)])
            .await
            .unwrap();

        let stored = store.get("Country", country.id).await.unwrap().unwrap();
        assert_eq!(stored.field("name"), &json!("Norge"));
        assert_eq!(stored.version, 1);
        assert!(store.get("City", city_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_apply_failure_leaves_store_untouched() {
        let store = MemoryStore::new();
        let country = store.insert(item("Country", "Norway")).await.unwrap();
        let city = store.insert(item("City", "Oslo")).await.unwrap();

        let mut stale = city.clone();
        stale.version = 7;
        let err = store
            .apply(vec![
                StoreWrite::delete("Country", country.id),
                StoreWrite::Insert(item("City", "Bergen")),
                StoreWrite::Update(stale),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, PortError::Conflict(_)));
        assert!(store.get("Country", country.id).await.unwrap().is_some());
        assert_eq!(store.count("City").await.unwrap(), 1);
        assert_eq!(store.get("City", city.id).await.unwrap().unwrap().version, 0);
    }

    #[tokio::test]
    async fn test_share_upsert_replaces_same_grant() {
        let store = MemoryShareStore::new();
        let target = ShareTarget::Group("pilots".into());
        store
            .upsert(Share::new(target.clone(), "Airline", PermissionLevel::View, None, "admin"))
            .await
            .unwrap();
        store
            .upsert(Share::new(target.clone(), "Airline", PermissionLevel::Edit, None, "admin"))
            .await
            .unwrap();

        let shares = store.list_for_type("Airline", None).await.unwrap();
        assert_eq!(shares.len(), 1);
        assert_eq!(shares[0].level, PermissionLevel::Edit);

        let claims = store.claims_for("ann", &["pilots".to_string()]).await.unwrap();
        assert_eq!(claims.len(), 1);
        assert!(store.claims_for("ann", &[]).await.unwrap().is_empty());

        assert!(store.remove(&target, "Airline", None).await.unwrap());
        assert!(!store.remove(&target, "Airline", None).await.unwrap());
    }
}
