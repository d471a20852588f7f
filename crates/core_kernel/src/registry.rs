//! Entity Type Registry
//!
//! This module provides the central registry of entity descriptors. Every
//! data type the system serves is registered here once at startup; the
//! generic repository resolves a type name through the registry instead of
//! inspecting types at runtime.
//!
//! # Validation
//!
//! Building the registry checks the relationships between descriptors:
//!
//! - every navigation target is registered
//! - inverse navigations exist and point back at the declaring type
//! - one-to-one and one-to-many principals name a reference on the target
//! - many-to-many join types hold a reference for each side
//!
//! # Usage
//!
//! ```rust,ignore
//! use core_kernel::registry::EntityRegistry;
//!
//! let registry = EntityRegistry::builder()
//!     .register(country)
//!     .register(city)
//!     .build()?;
//!
//! let descriptor = registry.get("City")?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::descriptor::{EntityDescriptor, NavigationDescriptor, Relationship};
use crate::error::CoreError;

/// A reference navigation on some type, seen from the type it points at
#[derive(Debug, Clone)]
pub struct ReferenceSite {
    pub source: Arc<EntityDescriptor>,
    pub navigation: NavigationDescriptor,
}

impl ReferenceSite {
    pub fn foreign_key(&self) -> &str {
        self.navigation.foreign_key().unwrap_or_default()
    }

    pub fn is_required(&self) -> bool {
        self.navigation.is_required()
    }
}

/// The validated set of registered data types
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    descriptors: HashMap<String, Arc<EntityDescriptor>>,
    order: Vec<String>,
}

impl EntityRegistry {
    pub fn builder() -> EntityRegistryBuilder {
        EntityRegistryBuilder::new()
    }

    /// Resolves a data type by name
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Schema` for an unregistered type
    pub fn get(&self, data_type: &str) -> Result<Arc<EntityDescriptor>, CoreError> {
        self.descriptors
            .get(data_type)
            .cloned()
            .ok_or_else(|| CoreError::schema(format!("data type '{}' is not registered", data_type)))
    }

    pub fn contains(&self, data_type: &str) -> bool {
        self.descriptors.contains_key(data_type)
    }

    /// Registered type names in registration order
    pub fn data_types(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Every reference navigation, on any type, whose target is `data_type`
    pub fn references_to(&self, data_type: &str) -> Vec<ReferenceSite> {
        self.order
            .iter()
            .filter_map(|name| self.descriptors.get(name))
            .flat_map(|source| {
                source
                    .references()
                    .filter(|n| n.target == data_type)
                    .map(|n| ReferenceSite {
                        source: Arc::clone(source),
                        navigation: n.clone(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Whether some many-to-many navigation links through this type
    pub fn is_join_type(&self, data_type: &str) -> bool {
        self.descriptors.values().any(|d| {
            d.navigations().iter().any(|n| {
                matches!(&n.relationship, Relationship::ManyToMany { join, .. } if join == data_type)
            })
        })
    }
}

/// Builder for the entity registry
///
/// # Example
///
/// ```rust,ignore
/// let registry = EntityRegistryBuilder::new()
///     .register(country)
///     .register_all(vec![city, leader])
///     .build()?;
/// ```
#[derive(Debug, Default)]
pub struct EntityRegistryBuilder {
    descriptors: Vec<EntityDescriptor>,
}

impl EntityRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, descriptor: EntityDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn register_all(mut self, descriptors: impl IntoIterator<Item = EntityDescriptor>) -> Self {
        self.descriptors.extend(descriptors);
        self
    }

    /// Validates relationships and freezes the registry
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Configuration` describing the first invalid
    /// registration found
    pub fn build(self) -> Result<EntityRegistry, CoreError> {
        let mut registry = EntityRegistry::default();
        for descriptor in self.descriptors {
            let name = descriptor.name().to_string();
            if registry.descriptors.contains_key(&name) {
                return Err(CoreError::Configuration(format!(
                    "data type '{}' is registered twice",
                    name
                )));
            }
            registry.order.push(name.clone());
            registry.descriptors.insert(name, Arc::new(descriptor));
        }

        for name in &registry.order {
            let descriptor = &registry.descriptors[name];
            for navigation in descriptor.navigations() {
                validate_navigation(&registry, descriptor, navigation)?;
            }
        }

        Ok(registry)
    }
}

fn validate_navigation(
    registry: &EntityRegistry,
    owner: &EntityDescriptor,
    navigation: &NavigationDescriptor,
) -> Result<(), CoreError> {
    let invalid = |message: String| {
        CoreError::Configuration(format!("{}.{}: {}", owner.name(), navigation.name, message))
    };

    let target = registry
        .descriptors
        .get(&navigation.target)
        .ok_or_else(|| invalid(format!("target '{}' is not registered", navigation.target)))?;

    match &navigation.relationship {
        Relationship::Reference { inverse: Some(inverse), .. } => {
            let mirror = target
                .navigation(inverse)
                .map_err(|_| invalid(format!("inverse '{}' not found", inverse)))?;
            let points_back = mirror.target == owner.name()
                && matches!(
                    &mirror.relationship,
                    Relationship::Dependent { inverse } | Relationship::Collection { inverse }
                        if inverse == &navigation.name
                );
            if !points_back {
                return Err(invalid(format!("inverse '{}' does not point back", inverse)));
            }
        }
        Relationship::Reference { inverse: None, .. } => {}
        Relationship::Dependent { inverse } | Relationship::Collection { inverse } => {
            let mirror = target
                .navigation(inverse)
                .map_err(|_| invalid(format!("inverse '{}' not found", inverse)))?;
            if mirror.target != owner.name() || mirror.foreign_key().is_none() {
                return Err(invalid(format!(
                    "inverse '{}' must be a reference to {}",
                    inverse,
                    owner.name()
                )));
            }
        }
        Relationship::ManyToMany { join, local_key, remote_key, inverse } => {
            let join_type = registry
                .descriptors
                .get(join)
                .ok_or_else(|| invalid(format!("join type '{}' is not registered", join)))?;
            let has_key = |key: &str, points_at: &str| {
                join_type
                    .references()
                    .any(|r| r.foreign_key() == Some(key) && r.target == points_at)
            };
            if !has_key(local_key, owner.name()) {
                return Err(invalid(format!(
                    "join '{}' has no reference '{}' to {}",
                    join,
                    local_key,
                    owner.name()
                )));
            }
            if !has_key(remote_key, &navigation.target) {
                return Err(invalid(format!(
                    "join '{}' has no reference '{}' to {}",
                    join, remote_key, navigation.target
                )));
            }
            if let Some(inverse) = inverse {
                let mirror = target
                    .navigation(inverse)
                    .map_err(|_| invalid(format!("inverse '{}' not found", inverse)))?;
                let mirrors = matches!(
                    &mirror.relationship,
                    Relationship::ManyToMany { join: other, .. } if other == join
                );
                if !mirrors {
                    return Err(invalid(format!(
                        "inverse '{}' must link through '{}'",
                        inverse, join
                    )));
                }
            }
        }
    }

    Ok(())
}
