//! Entity descriptors
//!
//! An [`EntityDescriptor`] is the metadata for one registered data type: its
//! primary key property, its scalar fields with display hints, and its
//! navigation properties. Every repository operation goes through the
//! descriptor of the type it serves.
//!
//! # Relationships
//!
//! Foreign keys always live on the dependent record:
//!
//! - [`Relationship::Reference`]: this type stores the foreign key
//!   (the many side of one-to-many, or the dependent side of one-to-one)
//! - [`Relationship::Dependent`]: principal side of a one-to-one; the target
//!   stores the key through its `inverse` reference
//! - [`Relationship::Collection`]: principal side of a one-to-many
//! - [`Relationship::ManyToMany`]: links go through a registered join type
//!   holding one key for each side
//!
//! # Example
//!
//! ```rust
//! use core_kernel::descriptor::{EntityDescriptor, FieldDescriptor, FieldKind, NavigationDescriptor};
//!
//! let city = EntityDescriptor::builder("City")
//!     .field(FieldDescriptor::new("name", FieldKind::Text).required())
//!     .navigation(NavigationDescriptor::reference("country", "Country", "countryId").required())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(city.primary_key(), "id");
//! assert!(city.field("countryId").is_some());
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::fields::FieldDefinition;
use crate::value::RESERVED_KEYS;

/// Produces the field map of a freshly added record
pub type Factory = Arc<dyn Fn() -> Map<String, Value> + Send + Sync>;

/// Storage kind of a scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Boolean,
    /// ISO-8601 calendar date (`2024-01-31`)
    Date,
    /// RFC 3339 timestamp
    DateTime,
    /// Time of day (`13:45` or `13:45:30`)
    Time,
    /// UUID string, used for foreign keys
    Uuid,
}

impl FieldKind {
    /// Checks that a non-null value has the shape this kind stores
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }
        match self {
            FieldKind::Text => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Decimal => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Date => value
                .as_str()
                .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()),
            FieldKind::DateTime => value
                .as_str()
                .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok()),
            FieldKind::Time => value.as_str().is_some_and(|s| {
                NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()
                    || NaiveTime::parse_from_str(s, "%H:%M").is_ok()
            }),
            FieldKind::Uuid => value.as_str().is_some_and(|s| uuid::Uuid::parse_str(s).is_ok()),
        }
    }

    /// The input hint used when a field does not name one
    pub fn default_input_type(&self) -> InputType {
        match self {
            FieldKind::Text => InputType::Text,
            FieldKind::Integer | FieldKind::Decimal => InputType::Number,
            FieldKind::Boolean => InputType::Checkbox,
            FieldKind::Date => InputType::Date,
            FieldKind::DateTime => InputType::DateTime,
            FieldKind::Time => InputType::Time,
            FieldKind::Uuid => InputType::Hidden,
        }
    }
}

/// Display hint for form and table rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputType {
    Text,
    TextArea,
    Number,
    Email,
    Telephone,
    Url,
    Password,
    Color,
    Range,
    Date,
    Time,
    #[serde(rename = "datetime")]
    DateTime,
    #[serde(rename = "datetime-local")]
    DateTimeLocal,
    Checkbox,
    Select,
    Hidden,
    /// A single related item
    Object,
    /// A collection of related items
    Collection,
}

impl InputType {
    /// Whether the hint renders a sortable table column
    pub fn is_tabular(&self) -> bool {
        matches!(
            self,
            InputType::Text
                | InputType::Number
                | InputType::Email
                | InputType::Telephone
                | InputType::Range
                | InputType::Time
                | InputType::Date
                | InputType::DateTime
                | InputType::DateTimeLocal
        )
    }
}

/// Metadata for one scalar field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub input_type: InputType,
    pub group_name: Option<String>,
    pub default: Value,
    pub required: bool,
    pub hidden: bool,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            label: humanize(&name),
            name,
            kind,
            input_type: kind.default_input_type(),
            group_name: None,
            default: Value::Null,
            required: false,
            hidden: kind == FieldKind::Uuid,
            max_length: None,
            min: None,
            max: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn input_type(mut self, input_type: InputType) -> Self {
        self.input_type = input_type;
        self
    }

    pub fn group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Visible text fields take part in free-text search
    pub fn is_searchable(&self) -> bool {
        self.kind == FieldKind::Text && !self.hidden
    }

    /// Checks a submitted value against this field's constraints
    pub fn validate(&self, value: &Value) -> Result<(), CoreError> {
        if value.is_null() {
            if self.required {
                return Err(CoreError::validation(format!("'{}' is required", self.name)));
            }
            return Ok(());
        }
        if !self.kind.accepts(value) {
            return Err(CoreError::validation(format!(
                "'{}' expects a {:?} value, got {}",
                self.name, self.kind, value
            )));
        }
        if let (Some(max_length), Some(text)) = (self.max_length, value.as_str()) {
            if text.chars().count() > max_length {
                return Err(CoreError::validation(format!(
                    "'{}' exceeds the maximum length of {}",
                    self.name, max_length
                )));
            }
        }
        if let Some(number) = value.as_f64() {
            let below = self.min.is_some_and(|min| number < min);
            let above = self.max.is_some_and(|max| number > max);
            if below || above {
                return Err(CoreError::validation(format!(
                    "'{}' is out of range",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// How a navigation property relates its owner to the target type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relationship {
    Reference {
        foreign_key: String,
        inverse: Option<String>,
        /// Dependents of a required reference are deleted with their parent
        required: bool,
    },
    Dependent {
        inverse: String,
    },
    Collection {
        inverse: String,
    },
    ManyToMany {
        join: String,
        /// Key on the join record pointing at the owner
        local_key: String,
        /// Key on the join record pointing at the target
        remote_key: String,
        inverse: Option<String>,
    },
}

impl Relationship {
    pub fn is_collection(&self) -> bool {
        matches!(self, Relationship::Collection { .. } | Relationship::ManyToMany { .. })
    }
}

/// Metadata for one navigation property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationDescriptor {
    pub name: String,
    pub label: String,
    pub target: String,
    pub relationship: Relationship,
    pub group_name: Option<String>,
    pub hidden: bool,
}

impl NavigationDescriptor {
    fn new(name: impl Into<String>, target: impl Into<String>, relationship: Relationship) -> Self {
        let name = name.into();
        Self {
            label: humanize(&name),
            name,
            target: target.into(),
            relationship,
            group_name: None,
            hidden: false,
        }
    }

    /// This type stores `foreign_key`, pointing at one `target`
    pub fn reference(
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            target,
            Relationship::Reference {
                foreign_key: foreign_key.into(),
                inverse: None,
                required: false,
            },
        )
    }

    /// Principal side of a one-to-one; `inverse` is the target's reference
    pub fn dependent(
        name: impl Into<String>,
        target: impl Into<String>,
        inverse: impl Into<String>,
    ) -> Self {
        Self::new(name, target, Relationship::Dependent { inverse: inverse.into() })
    }

    /// Principal side of a one-to-many; `inverse` is the target's reference
    pub fn collection(
        name: impl Into<String>,
        target: impl Into<String>,
        inverse: impl Into<String>,
    ) -> Self {
        Self::new(name, target, Relationship::Collection { inverse: inverse.into() })
    }

    /// Links through `join`, whose `local_key` points here and `remote_key`
    /// points at `target`
    pub fn many_to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        join: impl Into<String>,
        local_key: impl Into<String>,
        remote_key: impl Into<String>,
    ) -> Self {
        Self::new(
            name,
            target,
            Relationship::ManyToMany {
                join: join.into(),
                local_key: local_key.into(),
                remote_key: remote_key.into(),
                inverse: None,
            },
        )
    }

    /// Marks a reference as required. No effect on other relationships.
    pub fn required(mut self) -> Self {
        if let Relationship::Reference { required, .. } = &mut self.relationship {
            *required = true;
        }
        self
    }

    /// Names the navigation on the target type that mirrors this one
    pub fn inverse(mut self, name: impl Into<String>) -> Self {
        match &mut self.relationship {
            Relationship::Reference { inverse, .. } | Relationship::ManyToMany { inverse, .. } => {
                *inverse = Some(name.into());
            }
            Relationship::Dependent { inverse } | Relationship::Collection { inverse } => {
                *inverse = name.into();
            }
        }
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn group(mut self, group_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// The foreign key of a reference navigation
    pub fn foreign_key(&self) -> Option<&str> {
        match &self.relationship {
            Relationship::Reference { foreign_key, .. } => Some(foreign_key.as_str()),
            _ => None,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self.relationship, Relationship::Reference { required: true, .. })
    }
}

/// Immutable metadata for one registered data type
#[derive(Clone)]
pub struct EntityDescriptor {
    name: String,
    primary_key: String,
    fields: Vec<FieldDescriptor>,
    navigations: Vec<NavigationDescriptor>,
    factory: Option<Factory>,
    pub(crate) field_definitions: OnceCell<Vec<FieldDefinition>>,
}

impl fmt::Debug for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .field("fields", &self.fields)
            .field("navigations", &self.navigations)
            .field("factory", &self.factory.is_some())
            .finish()
    }
}

impl EntityDescriptor {
    pub fn builder(name: impl Into<String>) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn navigations(&self) -> &[NavigationDescriptor] {
        &self.navigations
    }

    /// Looks up a navigation by name
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Schema` if the type has no such navigation
    pub fn navigation(&self, name: &str) -> Result<&NavigationDescriptor, CoreError> {
        self.navigations.iter().find(|n| n.name == name).ok_or_else(|| {
            CoreError::schema(format!("{} has no navigation property '{}'", self.name, name))
        })
    }

    /// Reference navigations, i.e. the foreign keys this type stores
    pub fn references(&self) -> impl Iterator<Item = &NavigationDescriptor> {
        self.navigations
            .iter()
            .filter(|n| matches!(n.relationship, Relationship::Reference { .. }))
    }

    /// Whether a field holds the foreign key of a reference navigation
    pub fn is_foreign_key(&self, field_name: &str) -> bool {
        self.references().any(|n| n.foreign_key() == Some(field_name))
    }

    pub fn searchable_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_searchable())
    }

    /// Field values of a newly added, default-valued record
    ///
    /// Starts from the factory when one is registered; any field it leaves
    /// out gets its declared default.
    pub fn new_record(&self) -> Map<String, Value> {
        let mut record = self.factory.as_ref().map(|f| f()).unwrap_or_default();
        for field in &self.fields {
            record
                .entry(field.name.clone())
                .or_insert_with(|| field.default.clone());
        }
        record
    }
}

/// Fluent builder for [`EntityDescriptor`]
pub struct EntityDescriptorBuilder {
    name: String,
    primary_key: String,
    fields: Vec<FieldDescriptor>,
    navigations: Vec<NavigationDescriptor>,
    factory: Option<Factory>,
}

impl EntityDescriptorBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: "id".to_string(),
            fields: Vec::new(),
            navigations: Vec::new(),
            factory: None,
        }
    }

    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = name.into();
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a navigation; a reference also declares its hidden foreign key
    /// field unless one was added explicitly
    pub fn navigation(mut self, navigation: NavigationDescriptor) -> Self {
        if let Relationship::Reference { foreign_key, required, .. } = &navigation.relationship {
            if !self.fields.iter().any(|f| &f.name == foreign_key) {
                let mut key = FieldDescriptor::new(foreign_key.clone(), FieldKind::Uuid)
                    .label(navigation.label.clone());
                key.required = *required;
                self.fields.push(key);
            }
        }
        self.navigations.push(navigation);
        self
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Map<String, Value> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Validates the descriptor on its own
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Configuration` on duplicate or reserved names, a
    /// field shadowing the primary key, a foreign key that is not a UUID
    /// field, or a default value the field would reject.
    pub fn build(self) -> Result<EntityDescriptor, CoreError> {
        let config_error =
            |message: String| CoreError::Configuration(format!("{}: {}", self.name, message));

        if self.name.is_empty() {
            return Err(CoreError::Configuration("data type name is empty".to_string()));
        }

        let mut seen = std::collections::HashSet::new();
        let names = self
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(self.navigations.iter().map(|n| n.name.as_str()));
        for name in names {
            if name == self.primary_key {
                return Err(config_error(format!("'{}' shadows the primary key", name)));
            }
            if RESERVED_KEYS.contains(&name) {
                return Err(config_error(format!("'{}' is a reserved name", name)));
            }
            if !seen.insert(name) {
                return Err(config_error(format!("'{}' is declared twice", name)));
            }
        }

        for navigation in &self.navigations {
            if let Some(key) = navigation.foreign_key() {
                let is_uuid = self
                    .fields
                    .iter()
                    .any(|f| f.name == key && f.kind == FieldKind::Uuid);
                if !is_uuid {
                    return Err(config_error(format!(
                        "foreign key '{}' of '{}' must be a UUID field",
                        key, navigation.name
                    )));
                }
            }
        }

        for field in &self.fields {
            if !field.kind.accepts(&field.default) {
                return Err(config_error(format!(
                    "default of '{}' does not match its kind",
                    field.name
                )));
            }
        }

        Ok(EntityDescriptor {
            name: self.name,
            primary_key: self.primary_key,
            fields: self.fields,
            navigations: self.navigations,
            factory: self.factory,
            field_definitions: OnceCell::new(),
        })
    }
}

/// Turns `epiIndex` or `epi_index` into `Epi Index`
fn humanize(name: &str) -> String {
    let mut label = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for ch in name.chars() {
        if ch == '_' {
            label.push(' ');
            previous_lower = false;
            continue;
        }
        if ch.is_uppercase() && previous_lower {
            label.push(' ');
        }
        if label.is_empty() || label.ends_with(' ') {
            label.extend(ch.to_uppercase());
        } else {
            label.push(ch);
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
    }
    label
}
