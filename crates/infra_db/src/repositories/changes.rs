//! Staged writes of one repository operation
//!
//! An operation first reads what it needs and records its writes here, then
//! commits them with a single [`DataStore::apply`], so a failure leaves the
//! store as it was.

use std::collections::{BTreeMap, HashSet};

use core_kernel::{DataItem, DataStore, ItemId, PortError, StoreWrite};

type Key = (String, ItemId);

fn key(data_type: &str, id: ItemId) -> Key {
    (data_type.to_string(), id)
}

#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    inserts: Vec<DataItem>,
    updates: BTreeMap<Key, DataItem>,
    deletes: Vec<Key>,
    deleted: HashSet<Key>,
}

impl ChangeSet {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, item: DataItem) {
        self.inserts.push(item);
    }

    /// Stages a record's new state; a later call for the same record
    /// replaces the earlier one. Writes to deleted records are dropped.
    pub(crate) fn update(&mut self, item: DataItem) {
        if self.is_deleted(&item.data_type, item.id) {
            return;
        }
        if let Some(pending) = self
            .inserts
            .iter_mut()
            .find(|i| i.id == item.id && i.data_type == item.data_type)
        {
            *pending = item;
            return;
        }
        self.updates.insert(key(&item.data_type, item.id), item);
    }

    pub(crate) fn delete(&mut self, data_type: &str, id: ItemId) {
        let key = key(data_type, id);
        if !self.deleted.insert(key.clone()) {
            return;
        }
        self.updates.remove(&key);
        let before = self.inserts.len();
        self.inserts.retain(|i| !(i.id == id && i.data_type == data_type));
        if self.inserts.len() == before {
            self.deletes.push(key);
        }
    }

    pub(crate) fn is_deleted(&self, data_type: &str, id: ItemId) -> bool {
        self.deleted.contains(&key(data_type, id))
    }

    /// The staged state of a record, when this change set already touched it
    pub(crate) fn staged(&self, data_type: &str, id: ItemId) -> Option<&DataItem> {
        self.updates.get(&key(data_type, id)).or_else(|| {
            self.inserts
                .iter()
                .find(|i| i.id == id && i.data_type == data_type)
        })
    }

    pub(crate) fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// Applies every staged write in one batch: inserts, updates, deletes
    pub(crate) async fn commit(self, store: &dyn DataStore) -> Result<(), PortError> {
        let mut writes = Vec::with_capacity(self.inserts.len() + self.updates.len() + self.deletes.len());
        writes.extend(self.inserts.into_iter().map(StoreWrite::Insert));
        writes.extend(self.updates.into_values().map(StoreWrite::Update));
        writes.extend(
            self.deletes
                .into_iter()
                .map(|(data_type, id)| StoreWrite::Delete { data_type, id }),
        );

        if writes.is_empty() {
            return Ok(());
        }
        store.apply(writes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn item(data_type: &str) -> DataItem {
        DataItem::new(data_type, ItemId::new_v7(), Map::new())
    }

    #[test]
    fn test_delete_drops_staged_update() {
        let mut changes = ChangeSet::new();
        let mut city = item("City");
        city.set_field("name", json!("Oslo"));
        changes.update(city.clone());
        assert!(changes.staged("City", city.id).is_some());

        changes.delete("City", city.id);
        changes.update(city.clone());
        assert!(changes.staged("City", city.id).is_none());
        assert!(changes.is_deleted("City", city.id));
        assert_eq!(changes.deleted_count(), 1);
    }

    #[test]
    fn test_update_of_pending_insert_replaces_it() {
        let mut changes = ChangeSet::new();
        let link = item("AirlineCountry");
        changes.insert(link.clone());

        let mut changed = link.clone();
        changed.set_field("airlineId", json!("x"));
        changes.update(changed);

        assert_eq!(changes.inserts.len(), 1);
        assert!(changes.updates.is_empty());
        assert_eq!(changes.inserts[0].field("airlineId"), &json!("x"));

        changes.delete("AirlineCountry", link.id);
        assert!(changes.inserts.is_empty());
        assert!(changes.deletes.is_empty());
    }
}
