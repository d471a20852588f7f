//! Field definitions derived from entity descriptors
//!
//! Field definitions are the display metadata a client uses to render forms
//! and tables for a data type. They are derived once per descriptor and
//! cached on it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::{EntityDescriptor, InputType, Relationship};

/// How a navigation definition relates to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationKind {
    Reference,
    Dependent,
    Collection,
    ManyToMany,
}

/// UI metadata for one property of a data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub model: String,
    pub label: String,
    pub input_type: InputType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    pub default: Value,
    pub required: bool,
    pub hidden: bool,
    pub read_only: bool,
    /// Target data type of a navigation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation: Option<NavigationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl EntityDescriptor {
    /// Returns the field definitions of this type
    ///
    /// The primary key comes first, then scalar fields in declaration
    /// order, then navigations.
    pub fn field_definitions(&self) -> &[FieldDefinition] {
        self.field_definitions.get_or_init(|| derive_definitions(self))
    }
}

fn derive_definitions(descriptor: &EntityDescriptor) -> Vec<FieldDefinition> {
    let mut definitions =
        Vec::with_capacity(1 + descriptor.fields().len() + descriptor.navigations().len());

    definitions.push(FieldDefinition {
        model: descriptor.primary_key().to_string(),
        label: "Id".to_string(),
        input_type: InputType::Hidden,
        group_name: None,
        default: Value::Null,
        required: false,
        hidden: true,
        read_only: true,
        input_data_type: None,
        navigation: None,
        max_length: None,
        min: None,
        max: None,
    });

    for field in descriptor.fields() {
        definitions.push(FieldDefinition {
            model: field.name.clone(),
            label: field.label.clone(),
            input_type: field.input_type,
            group_name: field.group_name.clone(),
            default: field.default.clone(),
            required: field.required,
            hidden: field.hidden,
            read_only: descriptor.is_foreign_key(&field.name),
            input_data_type: None,
            navigation: None,
            max_length: field.max_length,
            min: field.min,
            max: field.max,
        });
    }

    for navigation in descriptor.navigations() {
        let (kind, input_type) = match navigation.relationship {
            Relationship::Reference { .. } => (NavigationKind::Reference, InputType::Object),
            Relationship::Dependent { .. } => (NavigationKind::Dependent, InputType::Object),
            Relationship::Collection { .. } => (NavigationKind::Collection, InputType::Collection),
            Relationship::ManyToMany { .. } => (NavigationKind::ManyToMany, InputType::Collection),
        };
        definitions.push(FieldDefinition {
            model: navigation.name.clone(),
            label: navigation.label.clone(),
            input_type,
            group_name: navigation.group_name.clone(),
            default: Value::Null,
            required: navigation.is_required(),
            hidden: navigation.hidden,
            read_only: false,
            input_data_type: Some(navigation.target.clone()),
            navigation: Some(kind),
            max_length: None,
            min: None,
            max: None,
        });
    }

    definitions
}
