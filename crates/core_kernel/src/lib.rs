//! Core Kernel - Foundational types for the dynamic data system
//!
//! This crate provides the building blocks every other crate works with:
//! - Entity descriptors and the validated type registry
//! - Stored records, view projections and placeholders
//! - Claims, permission levels and the authorization filter
//! - Paging types, field definitions and the store/share ports

pub mod authorization;
pub mod debounce;
pub mod descriptor;
pub mod error;
pub mod fields;
pub mod identifiers;
pub mod paging;
pub mod ports;
pub mod registry;
pub mod sharing;
pub mod value;

pub use authorization::{AuthorizationFilter, Claim, ClaimAuthorizer, ClaimScope, PermissionLevel};
pub use debounce::Debouncer;
pub use descriptor::{
    EntityDescriptor, FieldDescriptor, FieldKind, InputType, NavigationDescriptor, Relationship,
};
pub use error::CoreError;
pub use fields::{FieldDefinition, NavigationKind};
pub use identifiers::{ItemId, ShareId};
pub use paging::{IdFilter, PageRequest, PageResult};
pub use ports::{DataStore, PortError, StoreWrite};
pub use registry::EntityRegistry;
pub use sharing::{Share, SharePort, ShareTarget};
pub use value::{DataItem, FieldValue, ItemUpdate, ItemView, Placeholder};
