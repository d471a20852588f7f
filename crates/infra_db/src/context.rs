//! Repository factory
//!
//! A [`DataContext`] ties the type registry to a store and an authorization
//! filter, and hands out a [`Repository`] for any registered data type.

use std::fmt;
use std::sync::Arc;

use core_kernel::{AuthorizationFilter, ClaimAuthorizer, CoreError, DataStore, EntityRegistry};

use crate::repositories::Repository;

#[derive(Clone)]
pub struct DataContext {
    registry: Arc<EntityRegistry>,
    store: Arc<dyn DataStore>,
    authorizer: Arc<dyn AuthorizationFilter>,
}

impl fmt::Debug for DataContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataContext")
            .field("data_types", &self.registry.data_types().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl DataContext {
    /// Creates a context using the default [`ClaimAuthorizer`]
    pub fn new(registry: Arc<EntityRegistry>, store: Arc<dyn DataStore>) -> Self {
        Self {
            registry,
            store,
            authorizer: Arc::new(ClaimAuthorizer),
        }
    }

    /// Replaces the authorization filter
    pub fn with_authorizer(mut self, authorizer: Arc<dyn AuthorizationFilter>) -> Self {
        self.authorizer = authorizer;
        self
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn DataStore> {
        &self.store
    }

    pub fn authorizer(&self) -> &Arc<dyn AuthorizationFilter> {
        &self.authorizer
    }

    /// Returns the repository for a data type
    ///
    /// # Errors
    ///
    /// `CoreError::Schema` if the type is not registered
    pub fn repository(&self, data_type: &str) -> Result<Repository, CoreError> {
        let descriptor = self.registry.get(data_type)?;
        Ok(Repository::new(
            descriptor,
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.authorizer),
        ))
    }
}
