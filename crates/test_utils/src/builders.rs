//! Test Data Builders
//!
//! Builder patterns for constructing records with sensible defaults. Tests
//! specify only the relevant fields.

use serde_json::{Map, Value};

use core_kernel::{DataItem, ItemId};
use domain_sample::{AIRLINE, AIRLINE_COUNTRY, CITY, COUNTRY, LEADER};

use crate::generators::{fake_city_name, fake_country_name, fake_person_name};

/// Builder for constructing test records
#[derive(Debug, Clone)]
pub struct TestItemBuilder {
    data_type: String,
    id: ItemId,
    version: i64,
    fields: Map<String, Value>,
}

impl TestItemBuilder {
    /// Creates a builder for an empty record of the given type
    pub fn new(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            id: ItemId::new_v7(),
            version: 0,
            fields: Map::new(),
        }
    }

    /// A country with a fake name
    pub fn country() -> Self {
        Self::new(COUNTRY).with_field("name", fake_country_name())
    }

    /// A city with a fake name, attached to `country`
    pub fn city(country: ItemId) -> Self {
        Self::new(CITY)
            .with_field("name", fake_city_name())
            .with_field("isCapital", false)
            .with_reference("countryId", country)
    }

    /// A leader with a fake name, not attached to a country
    pub fn leader() -> Self {
        Self::new(LEADER)
            .with_field("name", fake_person_name())
            .with_field("title", "Prime Minister")
            .with_field("countryId", Value::Null)
            .with_field("hometownId", Value::Null)
    }

    pub fn airline(name: &str) -> Self {
        Self::new(AIRLINE).with_field("name", name)
    }

    /// A join record linking an airline and a country
    pub fn airline_country(airline: ItemId, country: ItemId) -> Self {
        Self::new(AIRLINE_COUNTRY)
            .with_reference("airlineId", airline)
            .with_reference("countryId", country)
    }

    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = id;
        self
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn with_reference(self, key: &str, id: ItemId) -> Self {
        self.with_field(key, id.to_json())
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Builds the record
    pub fn build(self) -> DataItem {
        let mut item = DataItem::new(self.data_type, self.id, self.fields);
        item.version = self.version;
        item
    }
}
