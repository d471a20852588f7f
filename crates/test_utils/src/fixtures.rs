//! Pre-built Test Fixtures
//!
//! Contexts over the sample registry backed by the in-memory store, and the
//! claim sets tests use to exercise authorization.

use std::sync::Arc;

use core_kernel::{Claim, DataItem, EntityRegistry, ItemId, PermissionLevel};
use infra_db::{DataContext, MemoryStore};

/// Fixture for repository contexts
pub struct ContextFixtures;

impl ContextFixtures {
    /// The sample registry
    ///
    /// # Panics
    ///
    /// Panics if the sample registrations are inconsistent
    pub fn registry() -> Arc<EntityRegistry> {
        Arc::new(domain_sample::registry().expect("sample registry is valid"))
    }

    /// An empty in-memory context over the sample types
    pub fn empty() -> DataContext {
        Self::with_store(MemoryStore::new())
    }

    /// A context whose store holds the sample data set
    pub async fn seeded() -> (DataContext, Vec<DataItem>) {
        let items = domain_sample::sample_items();
        let store = MemoryStore::with_items(items.clone()).await;
        (Self::with_store(store), items)
    }

    /// A context over the given memory store
    pub fn with_store(store: MemoryStore) -> DataContext {
        DataContext::new(Self::registry(), Arc::new(store))
    }
}

/// Fixture for claim sets
pub struct ClaimFixtures;

impl ClaimFixtures {
    /// Every permission on every type
    pub fn admin() -> Vec<Claim> {
        vec![Claim::for_all_types(PermissionLevel::All)]
    }

    /// View access to every instance of one type
    pub fn viewer(data_type: &str) -> Vec<Claim> {
        vec![Claim::for_type(data_type, PermissionLevel::View)]
    }

    /// View access to the listed instances only
    pub fn item_viewer(data_type: &str, ids: &[ItemId]) -> Vec<Claim> {
        ids.iter()
            .map(|id| Claim::for_item(data_type, *id, PermissionLevel::View))
            .collect()
    }

    /// No claims at all
    pub fn anonymous() -> Vec<Claim> {
        Vec::new()
    }
}

/// Fixture for sample record lookups
pub struct SampleFixtures;

impl SampleFixtures {
    /// Finds a seeded record by type and `name`
    ///
    /// # Panics
    ///
    /// Panics if no such record was seeded
    pub fn named<'a>(items: &'a [DataItem], data_type: &str, name: &str) -> &'a DataItem {
        items
            .iter()
            .find(|i| i.data_type == data_type && i.field("name").as_str() == Some(name))
            .unwrap_or_else(|| panic!("no seeded {} named {}", data_type, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_fixture() {
        assert!(ContextFixtures::registry().contains("Country"));
    }

    #[test]
    fn test_claim_fixtures() {
        assert_eq!(ClaimFixtures::admin().len(), 1);
        let ids = [ItemId::new_v7(), ItemId::new_v7()];
        assert_eq!(ClaimFixtures::item_viewer("City", &ids).len(), 2);
        assert!(ClaimFixtures::anonymous().is_empty());
    }

    #[tokio::test]
    async fn test_seeded_lookup() {
        let (_, items) = ContextFixtures::seeded().await;
        let oslo = SampleFixtures::named(&items, "City", "Oslo");
        assert!(oslo.foreign_key("countryId").is_some());
    }
}
