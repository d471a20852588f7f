//! Stored records, view projections and update payloads
//!
//! A [`DataItem`] is the opaque record held by a store: an id, the name of its
//! data type and a JSON field map. Repositories never hand out field maps
//! directly to callers; they project them into an [`ItemView`] and accept
//! changes as an [`ItemUpdate`].
//!
//! Navigation properties are not stored on the record. In a view they appear
//! either as the related id or as a [`Placeholder`], and placeholders coming
//! back in an update are stripped so they never overwrite stored data.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::identifiers::ItemId;

/// View key carrying the data type name
pub const DATA_TYPE_KEY: &str = "dataType";
/// View key naming the primary key property
pub const PRIMARY_KEY_PROPERTY_KEY: &str = "primaryKeyProperty";
/// View key carrying the optimistic concurrency version
pub const ROW_VERSION_KEY: &str = "rowVersion";

/// Keys reserved by the view projection; no field may use them
pub const RESERVED_KEYS: [&str; 3] = [DATA_TYPE_KEY, PRIMARY_KEY_PROPERTY_KEY, ROW_VERSION_KEY];

/// A stored record of any registered data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub id: ItemId,
    pub data_type: String,
    /// Incremented by the store on every successful update
    pub version: i64,
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DataItem {
    /// Creates a new, not yet stored record
    pub fn new(data_type: impl Into<String>, id: ItemId, fields: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id,
            data_type: data_type.into(),
            version: 0,
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a field value, `Null` when absent
    pub fn field(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&Value::Null)
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Reads a foreign key field
    pub fn foreign_key(&self, name: &str) -> Option<ItemId> {
        ItemId::from_json(self.field(name))
    }

    pub fn set_foreign_key(&mut self, name: &str, id: Option<ItemId>) {
        let value = id.map(ItemId::to_json).unwrap_or(Value::Null);
        self.fields.insert(name.to_string(), value);
    }
}

/// Marker shown in place of navigation data that is not expanded in a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// No related item is attached
    None,
    /// A collection that is not expanded inline
    Elided,
}

impl Placeholder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placeholder::None => "[None]",
            Placeholder::Elided => "[...]",
        }
    }

    /// Recognizes the wire form of a placeholder
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "[None]" => Some(Placeholder::None),
            "[...]" => Some(Placeholder::Elided),
            _ => None,
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value in a view or an update: either real data or a placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Value(Value),
    Placeholder(Placeholder),
}

impl FieldValue {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, FieldValue::Placeholder(_))
    }

    /// Returns the concrete value, if this is not a placeholder
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(value) => Some(value),
            FieldValue::Placeholder(_) => None,
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value.as_str().and_then(Placeholder::parse) {
            Some(placeholder) => FieldValue::Placeholder(placeholder),
            None => FieldValue::Value(value),
        }
    }
}

impl From<Placeholder> for FieldValue {
    fn from(placeholder: Placeholder) -> Self {
        FieldValue::Placeholder(placeholder)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Value(value) => value.serialize(serializer),
            FieldValue::Placeholder(placeholder) => serializer.serialize_str(placeholder.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(FieldValue::from)
    }
}

/// The view-model projection of a record
///
/// Serializes as a flat JSON object holding `dataType`,
/// `primaryKeyProperty`, `rowVersion` and one entry per field or navigation.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub data_type: String,
    pub primary_key_property: String,
    pub version: i64,
    pub values: BTreeMap<String, FieldValue>,
}

impl ItemView {
    /// Returns the primary key of the projected record
    pub fn id(&self) -> Option<ItemId> {
        self.value(&self.primary_key_property).and_then(ItemId::from_json)
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Returns a concrete value, skipping placeholders
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name).and_then(FieldValue::as_value)
    }
}

impl Serialize for ItemView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 3))?;
        map.serialize_entry(DATA_TYPE_KEY, &self.data_type)?;
        map.serialize_entry(PRIMARY_KEY_PROPERTY_KEY, &self.primary_key_property)?;
        map.serialize_entry(ROW_VERSION_KEY, &self.version)?;
        for (key, value) in &self.values {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Field changes to apply to an existing record
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    pub id: ItemId,
    /// When set, the update fails with a conflict unless the stored
    /// version still matches
    pub expected_version: Option<i64>,
    pub values: BTreeMap<String, FieldValue>,
}

impl ItemUpdate {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            expected_version: None,
            values: BTreeMap::new(),
        }
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), FieldValue::Value(value.into()));
        self
    }

    pub fn placeholder(mut self, name: impl Into<String>, placeholder: Placeholder) -> Self {
        self.values.insert(name.into(), FieldValue::Placeholder(placeholder));
        self
    }

    pub fn expect_version(mut self, version: i64) -> Self {
        self.expected_version = Some(version);
        self
    }

    /// Builds an update from a submitted view object
    ///
    /// The primary key property supplies the id, `rowVersion` the expected
    /// version; `dataType` and `primaryKeyProperty` are dropped.
    pub fn from_view_object(
        primary_key: &str,
        mut object: Map<String, Value>,
    ) -> Result<Self, CoreError> {
        let id = object
            .remove(primary_key)
            .as_ref()
            .and_then(ItemId::from_json)
            .ok_or_else(|| CoreError::validation(format!("missing or invalid '{}'", primary_key)))?;

        let expected_version = match object.remove(ROW_VERSION_KEY) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value.as_i64().ok_or_else(|| {
                CoreError::validation(format!("'{}' must be an integer", ROW_VERSION_KEY))
            })?),
        };

        object.remove(DATA_TYPE_KEY);
        object.remove(PRIMARY_KEY_PROPERTY_KEY);

        Ok(Self {
            id,
            expected_version,
            values: object.into_iter().map(|(k, v)| (k, FieldValue::from(v))).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_placeholder_strings_are_recognized() {
        assert_eq!(FieldValue::from(json!("[None]")), FieldValue::Placeholder(Placeholder::None));
        assert_eq!(FieldValue::from(json!("[...]")), FieldValue::Placeholder(Placeholder::Elided));
        assert_eq!(FieldValue::from(json!("None")), FieldValue::Value(json!("None")));
    }

    #[test]
    fn test_view_serializes_flat() {
        let id = ItemId::new();
        let mut values = BTreeMap::new();
        values.insert("id".to_string(), FieldValue::Value(id.to_json()));
        values.insert("cities".to_string(), FieldValue::Placeholder(Placeholder::Elided));
        let view = ItemView {
            data_type: "Country".to_string(),
            primary_key_property: "id".to_string(),
            version: 3,
            values,
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["dataType"], "Country");
        assert_eq!(json["primaryKeyProperty"], "id");
        assert_eq!(json["rowVersion"], 3);
        assert_eq!(json["cities"], "[...]");
        assert_eq!(view.id(), Some(id));
    }

    #[test]
    fn test_update_from_view_object() {
        let id = ItemId::new();
        let object = json!({
            "dataType": "Country",
            "primaryKeyProperty": "id",
            "id": id.to_string(),
            "rowVersion": 2,
            "name": "Norway",
            "leader": "[None]"
        });
        let Value::Object(object) = object else { unreachable!() };

        let update = ItemUpdate::from_view_object("id", object).unwrap();
        assert_eq!(update.id, id);
        assert_eq!(update.expected_version, Some(2));
        assert_eq!(update.values.len(), 2);
        assert!(update.values["leader"].is_placeholder());
    }

    #[test]
    fn test_update_without_id_is_rejected() {
        let Value::Object(object) = json!({ "name": "x" }) else { unreachable!() };
        let error = ItemUpdate::from_view_object("id", object).unwrap_err();
        assert!(matches!(error, CoreError::Validation(_)));
    }
}
