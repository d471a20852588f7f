//! Generic repository
//!
//! One [`Repository`] serves any registered data type. It resolves
//! everything through the type's [`EntityDescriptor`] and the registry:
//! which fields exist and how to validate them, which foreign keys the
//! record holds, and which other types point at it.
//!
//! # Relationships
//!
//! Foreign keys live on the dependent record, so "attaching" a child always
//! means writing the child's key field:
//!
//! - collections (one-to-many) and one-to-one principals are resolved by
//!   querying the target type for records whose key equals the parent id
//! - many-to-many links are records of the join type holding both keys
//!
//! # Deletion
//!
//! Removing a record cascades through every reference to its type: records
//! holding a required reference are removed as well, optional references are
//! cleared. Join records hold required references, so links go away with
//! either side.
//!
//! Operations that write more than one record stage their writes in a
//! change set and commit them as one store batch: either all of them land
//! or none do.
//!
//! # Paging and authorization
//!
//! [`Repository::get_page`] searches, filters by id, sorts and takes the
//! requested window before authorization is applied, so a page may hold
//! fewer items than requested. The reported total counts every matched item
//! the caller may view.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use super::changes::ChangeSet;

use core_kernel::descriptor::{EntityDescriptor, NavigationDescriptor, Relationship};
use core_kernel::{
    AuthorizationFilter, Claim, CoreError, DataItem, DataStore, EntityRegistry, FieldDefinition,
    FieldValue, IdFilter, ItemId, ItemUpdate, ItemView, PageRequest, PageResult, PermissionLevel,
    Placeholder,
};

/// CRUD, paging and navigation management for one data type
#[derive(Clone)]
pub struct Repository {
    descriptor: Arc<EntityDescriptor>,
    registry: Arc<EntityRegistry>,
    store: Arc<dyn DataStore>,
    authorizer: Arc<dyn AuthorizationFilter>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("data_type", &self.descriptor.name())
            .finish_non_exhaustive()
    }
}

impl Repository {
    pub fn new(
        descriptor: Arc<EntityDescriptor>,
        registry: Arc<EntityRegistry>,
        store: Arc<dyn DataStore>,
        authorizer: Arc<dyn AuthorizationFilter>,
    ) -> Self {
        Self {
            descriptor,
            registry,
            store,
            authorizer,
        }
    }

    pub fn data_type(&self) -> &str {
        self.descriptor.name()
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    /// Display metadata for this type, derived once per descriptor
    pub fn field_definitions(&self) -> &[FieldDefinition] {
        self.descriptor.field_definitions()
    }

    /// The repository of another registered type, sharing store and filter
    pub fn related(&self, data_type: &str) -> Result<Repository, CoreError> {
        Ok(Repository::new(
            self.registry.get(data_type)?,
            Arc::clone(&self.registry),
            Arc::clone(&self.store),
            Arc::clone(&self.authorizer),
        ))
    }

    /// Parses a submitted view object into an update for this type
    pub fn update_from_view(&self, object: Map<String, Value>) -> Result<ItemUpdate, CoreError> {
        ItemUpdate::from_view_object(self.descriptor.primary_key(), object)
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// Creates a default-valued record
    ///
    /// When both a reference navigation and a parent id are given, the new
    /// record is attached to that parent.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the parent does not exist
    /// - `Conflict` if the parent is one-to-one and already has a dependent
    /// - `Schema` if the navigation is unknown or not a reference
    #[instrument(skip(self), fields(data_type = %self.data_type()))]
    pub async fn add(
        &self,
        navigation: Option<&str>,
        parent_id: Option<ItemId>,
    ) -> Result<ItemView, CoreError> {
        let mut item = DataItem::new(self.data_type(), ItemId::new_v7(), self.descriptor.new_record());

        if let (Some(navigation), Some(parent_id)) = (navigation, parent_id) {
            let navigation = self.descriptor.navigation(navigation)?;
            let key = reference_key(navigation)?;

            if self.store.get(&navigation.target, parent_id).await?.is_none() {
                return Err(CoreError::item_not_found(&navigation.target, parent_id));
            }

            if self.is_one_to_one(navigation)? {
                self.ensure_vacant(navigation, parent_id, item.id).await?;
            }

            item.set_foreign_key(key, Some(parent_id));
        }

        let stored = self.store.insert(item).await?;
        info!(id = %stored.id, "Added item");
        self.project(&stored).await
    }

    /// Looks up a record; a missing id is `None`, not an error
    pub async fn find(&self, id: ItemId) -> Result<Option<ItemView>, CoreError> {
        match self.find_item(id).await? {
            Some(item) => Ok(Some(self.project(&item).await?)),
            None => Ok(None),
        }
    }

    /// The stored record behind [`find`](Self::find)
    pub async fn find_item(&self, id: ItemId) -> Result<Option<DataItem>, CoreError> {
        Ok(self.store.get(self.data_type(), id).await?)
    }

    /// Every record the claims allow viewing
    pub async fn get_all(&self, claims: &[Claim]) -> Result<Vec<ItemView>, CoreError> {
        let full_access = self.authorizer.has_full_type_claim(claims, self.data_type());
        let items = self.store.list(self.data_type()).await?;

        let mut views = Vec::with_capacity(items.len());
        for item in items.iter().filter(|i| full_access || self.can_view(claims, i.id)) {
            views.push(self.project(item).await?);
        }
        Ok(views)
    }

    /// Number of records the claims allow viewing
    pub async fn get_total(&self, claims: &[Claim]) -> Result<usize, CoreError> {
        if self.authorizer.has_full_type_claim(claims, self.data_type()) {
            return Ok(self.store.count(self.data_type()).await?);
        }
        let items = self.store.list(self.data_type()).await?;
        Ok(items.iter().filter(|i| self.can_view(claims, i.id)).count())
    }

    /// Applies submitted values onto an existing record
    ///
    /// Placeholders are skipped and never overwrite stored data; the primary
    /// key and navigation names are ignored.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the record does not exist
    /// - `Validation` for unknown fields, kind mismatches, over-length text,
    ///   missing required values or a key naming a missing record
    /// - `Conflict` if the record changed since `expected_version`, or if a
    ///   one-to-one key names a parent that already has another dependent
    #[instrument(skip(self, update), fields(data_type = %self.data_type(), id = %update.id))]
    pub async fn update(&self, update: ItemUpdate) -> Result<ItemView, CoreError> {
        let mut item = self.require(update.id).await?;

        if let Some(expected) = update.expected_version {
            if expected != item.version {
                return Err(CoreError::conflict(format!(
                    "{} '{}' was modified (version {} is stale, current is {})",
                    self.data_type(),
                    item.id,
                    expected,
                    item.version
                )));
            }
        }

        for (name, value) in update.values {
            let value = match value {
                FieldValue::Placeholder(placeholder) => {
                    debug!(field = %name, %placeholder, "Skipping placeholder value");
                    continue;
                }
                FieldValue::Value(value) => value,
            };

            if name == self.descriptor.primary_key() || self.descriptor.navigation(&name).is_ok() {
                continue;
            }

            let field = self.descriptor.field(&name).ok_or_else(|| {
                CoreError::validation(format!("{} has no field '{}'", self.data_type(), name))
            })?;
            field.validate(&value)?;

            let value = match self
                .descriptor
                .references()
                .find(|n| n.foreign_key() == Some(name.as_str()))
            {
                Some(navigation) => {
                    let value = self.resolve_reference(navigation, &value).await?;
                    if let Some(parent_id) = ItemId::from_json(&value) {
                        let moved = item.foreign_key(&name) != Some(parent_id);
                        if moved && self.is_one_to_one(navigation)? {
                            self.ensure_vacant(navigation, parent_id, item.id).await?;
                        }
                    }
                    value
                }
                None => value,
            };

            item.set_field(name, value);
        }

        let stored = self.store.update(item).await?;
        debug!(version = stored.version, "Updated item");
        self.project(&stored).await
    }

    /// Removes a record and cascades to the records referencing it
    ///
    /// # Errors
    ///
    /// `NotFound` if the record does not exist
    #[instrument(skip(self), fields(data_type = %self.data_type()))]
    pub async fn remove(&self, id: ItemId) -> Result<(), CoreError> {
        self.require(id).await?;

        let mut changes = ChangeSet::new();
        self.plan_delete(&mut changes, Arc::clone(&self.descriptor), id).await?;
        let removed = changes.deleted_count();
        changes.commit(self.store.as_ref()).await?;

        info!(removed, "Removed item");
        Ok(())
    }

    /// Removes several records; ids that do not resolve are skipped
    ///
    /// Returns the ids that were removed by this call. The whole range is
    /// removed in one batch.
    #[instrument(skip(self, ids), fields(data_type = %self.data_type(), count = ids.len()))]
    pub async fn remove_range(&self, ids: &[ItemId]) -> Result<Vec<ItemId>, CoreError> {
        let mut changes = ChangeSet::new();
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if changes.is_deleted(self.data_type(), *id) || self.find_item(*id).await?.is_none() {
                debug!(%id, "Skipping missing item");
                continue;
            }
            self.plan_delete(&mut changes, Arc::clone(&self.descriptor), *id).await?;
            removed.push(*id);
        }
        changes.commit(self.store.as_ref()).await?;

        info!(removed = removed.len(), "Removed items");
        Ok(removed)
    }

    /// Copies a record's scalar fields into a new record
    ///
    /// Collections are not copied and one-to-one keys are reset, so the copy
    /// never takes a parent's single dependent slot.
    #[instrument(skip(self), fields(data_type = %self.data_type()))]
    pub async fn duplicate(&self, id: ItemId) -> Result<ItemView, CoreError> {
        let source = self.require(id).await?;

        let mut fields = source.fields;
        fields.retain(|name, _| self.descriptor.field(name).is_some());
        for navigation in self.descriptor.references() {
            if let (true, Some(key)) = (self.is_one_to_one(navigation)?, navigation.foreign_key()) {
                fields.insert(key.to_string(), Value::Null);
            }
        }

        let stored = self
            .store
            .insert(DataItem::new(self.data_type(), ItemId::new_v7(), fields))
            .await?;
        info!(copy = %stored.id, "Duplicated item");
        self.project(&stored).await
    }

    // ------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------

    /// Searches, filters, sorts and pages the records of this type
    ///
    /// Search is a case-insensitive substring match over visible text
    /// fields. Sorting is stable and breaks ties by primary key; without a
    /// sort field the primary key orders the result. Items the claims do not
    /// allow viewing are dropped from the page after it is cut, and the
    /// total counts the viewable items of the whole matched set.
    ///
    /// # Errors
    ///
    /// `Validation` if `sort_by` names no field of this type
    #[instrument(skip(self, claims), fields(data_type = %self.data_type()))]
    pub async fn get_page(
        &self,
        request: PageRequest,
        claims: &[Claim],
    ) -> Result<PageResult<ItemView>, CoreError> {
        let sort_field = self.sort_field(request.sort_by.as_deref())?;

        let mut matched = self.store.list(self.data_type()).await?;
        let keep = request.id_filter.matcher();
        matched.retain(|item| keep(&item.id));
        if let Some(needle) = request.normalized_search() {
            matched.retain(|item| self.matches_search(item, &needle));
        }
        sort_items(&mut matched, sort_field, request.descending);

        let full_access = self.authorizer.has_full_type_claim(claims, self.data_type());
        let total = if full_access {
            matched.len()
        } else {
            matched.iter().filter(|i| self.can_view(claims, i.id)).count()
        };

        let window: Vec<DataItem> = match request.window() {
            Some((skip, take)) => matched.into_iter().skip(skip).take(take).collect(),
            None => matched,
        };

        let mut items = Vec::with_capacity(window.len());
        for item in window.iter().filter(|i| full_access || self.can_view(claims, i.id)) {
            items.push(self.project(item).await?);
        }

        debug!(page_items = items.len(), total, full_access, "Loaded page");
        Ok(PageResult { items, total })
    }

    // ------------------------------------------------------------------
    // Navigation management
    // ------------------------------------------------------------------

    /// Deletes a child attached through the named reference
    ///
    /// Returns `false` when the child does not exist or is not attached.
    #[instrument(skip(self), fields(data_type = %self.data_type()))]
    pub async fn remove_from_parent(&self, id: ItemId, navigation: &str) -> Result<bool, CoreError> {
        Ok(!self.remove_range_from_parent(&[id], navigation).await?.is_empty())
    }

    /// [`remove_from_parent`](Self::remove_from_parent) for several children,
    /// in one batch; returns the ids that were removed
    #[instrument(skip(self, ids), fields(data_type = %self.data_type(), count = ids.len()))]
    pub async fn remove_range_from_parent(
        &self,
        ids: &[ItemId],
        navigation: &str,
    ) -> Result<Vec<ItemId>, CoreError> {
        let navigation = self.descriptor.navigation(navigation)?;
        let key = reference_key(navigation)?;

        let mut changes = ChangeSet::new();
        let mut removed = Vec::with_capacity(ids.len());
        for id in ids {
            if changes.is_deleted(self.data_type(), *id) {
                continue;
            }
            let attached = self
                .find_item(*id)
                .await?
                .is_some_and(|child| child.foreign_key(key).is_some());
            if !attached {
                debug!(%id, "Item is missing or not attached to a parent");
                continue;
            }
            self.plan_delete(&mut changes, Arc::clone(&self.descriptor), *id).await?;
            removed.push(*id);
        }
        changes.commit(self.store.as_ref()).await?;

        info!(removed = removed.len(), "Removed items from parent");
        Ok(removed)
    }

    /// Links existing children into a collection of `parent_id`
    ///
    /// One-to-many children get their key set; many-to-many children get a
    /// join record unless one already exists. Returns the number of new links.
    #[instrument(skip(self, child_ids), fields(data_type = %self.data_type(), count = child_ids.len()))]
    pub async fn add_children_to_collection(
        &self,
        parent_id: ItemId,
        navigation: &str,
        child_ids: &[ItemId],
    ) -> Result<usize, CoreError> {
        let navigation = self.descriptor.navigation(navigation)?;
        self.require(parent_id).await?;

        let children = self.store.get_many(&navigation.target, child_ids).await?;
        if let Some(missing) = child_ids.iter().find(|id| !children.iter().any(|c| c.id == **id)) {
            return Err(CoreError::item_not_found(&navigation.target, missing));
        }

        let mut changes = ChangeSet::new();
        let mut attached = 0;
        match &navigation.relationship {
            Relationship::Collection { .. } => {
                let key = self.inverse_key(navigation)?;
                for mut child in children {
                    if child.foreign_key(&key) == Some(parent_id)
                        || changes.staged(&child.data_type, child.id).is_some()
                    {
                        continue;
                    }
                    child.set_foreign_key(&key, Some(parent_id));
                    changes.update(child);
                    attached += 1;
                }
            }
            Relationship::ManyToMany { join, local_key, remote_key, .. } => {
                let join_descriptor = self.registry.get(join)?;
                let mut linked: HashSet<ItemId> = self
                    .store
                    .find_by_field(join, local_key, &parent_id.to_json())
                    .await?
                    .iter()
                    .filter_map(|link| link.foreign_key(remote_key))
                    .collect();

                for child in children {
                    if !linked.insert(child.id) {
                        continue;
                    }
                    let mut link = DataItem::new(join.as_str(), ItemId::new_v7(), join_descriptor.new_record());
                    link.set_foreign_key(local_key, Some(parent_id));
                    link.set_foreign_key(remote_key, Some(child.id));
                    changes.insert(link);
                    attached += 1;
                }
            }
            _ => return Err(not_a_collection(navigation)),
        }
        changes.commit(self.store.as_ref()).await?;

        info!(attached, "Added children to collection");
        Ok(attached)
    }

    /// Unlinks children from a collection of `parent_id`
    ///
    /// Many-to-many links are deleted by pair. One-to-many children are
    /// detached, or deleted when their reference to the parent is required.
    /// Children that are not linked are skipped. Returns the number removed.
    #[instrument(skip(self, child_ids), fields(data_type = %self.data_type(), count = child_ids.len()))]
    pub async fn remove_children_from_collection(
        &self,
        parent_id: ItemId,
        navigation: &str,
        child_ids: &[ItemId],
    ) -> Result<usize, CoreError> {
        let navigation = self.descriptor.navigation(navigation)?;
        let wanted: HashSet<ItemId> = child_ids.iter().copied().collect();

        let mut changes = ChangeSet::new();
        let mut removed = 0;
        match &navigation.relationship {
            Relationship::Collection { inverse } => {
                let target = self.registry.get(&navigation.target)?;
                let reference = target.navigation(inverse)?;
                let key = reference_key(reference)?;

                for child_id in &wanted {
                    if changes.is_deleted(&navigation.target, *child_id) {
                        continue;
                    }
                    let Some(mut child) = self.store.get(&navigation.target, *child_id).await? else {
                        continue;
                    };
                    if child.foreign_key(key) != Some(parent_id) {
                        continue;
                    }
                    if reference.is_required() {
                        self.plan_delete(&mut changes, Arc::clone(&target), *child_id).await?;
                    } else {
                        child.set_foreign_key(key, None);
                        changes.update(child);
                    }
                    removed += 1;
                }
            }
            Relationship::ManyToMany { join, local_key, remote_key, .. } => {
                let join_descriptor = self.registry.get(join)?;
                let links = self
                    .store
                    .find_by_field(join, local_key, &parent_id.to_json())
                    .await?;
                for link in links {
                    let linked = link.foreign_key(remote_key).is_some_and(|id| wanted.contains(&id));
                    if linked {
                        self.plan_delete(&mut changes, Arc::clone(&join_descriptor), link.id).await?;
                        removed += 1;
                    }
                }
            }
            _ => return Err(not_a_collection(navigation)),
        }
        changes.commit(self.store.as_ref()).await?;

        info!(removed, "Removed children from collection");
        Ok(removed)
    }

    /// Whether `remove_children_from_collection` deletes the children it
    /// unlinks, which happens when their reference to the parent is required
    ///
    /// # Errors
    ///
    /// `Schema` if the navigation is unknown or not a collection
    pub fn unlinking_deletes(&self, navigation: &str) -> Result<bool, CoreError> {
        let navigation = self.descriptor.navigation(navigation)?;
        match &navigation.relationship {
            Relationship::Collection { inverse } => {
                let target = self.registry.get(&navigation.target)?;
                Ok(target.navigation(inverse)?.is_required())
            }
            Relationship::ManyToMany { .. } => Ok(false),
            _ => Err(not_a_collection(navigation)),
        }
    }

    /// The single related id behind a reference or one-to-one navigation
    ///
    /// # Errors
    ///
    /// `NotFound` if the parent does not exist; `Schema` for collections
    pub async fn get_child_id(
        &self,
        parent_id: ItemId,
        navigation: &str,
    ) -> Result<Option<ItemId>, CoreError> {
        let navigation = self.descriptor.navigation(navigation)?;
        let parent = self.require(parent_id).await?;

        match &navigation.relationship {
            Relationship::Reference { foreign_key, .. } => Ok(parent.foreign_key(foreign_key)),
            Relationship::Dependent { .. } => {
                let key = self.inverse_key(navigation)?;
                let children = self
                    .store
                    .find_by_field(&navigation.target, &key, &parent_id.to_json())
                    .await?;
                Ok(children.first().map(|c| c.id))
            }
            _ => Err(CoreError::schema(format!(
                "'{}' is a collection navigation",
                navigation.name
            ))),
        }
    }

    /// Number of items behind a navigation; 0 for a missing parent
    pub async fn get_child_total(&self, parent_id: ItemId, navigation: &str) -> Result<usize, CoreError> {
        let navigation = self.descriptor.navigation(navigation)?;
        Ok(self.child_ids(parent_id, navigation).await?.len())
    }

    /// A page of the items behind a navigation
    ///
    /// The request's own id filter narrows the children further.
    #[instrument(skip(self, claims), fields(data_type = %self.data_type()))]
    pub async fn get_child_page(
        &self,
        parent_id: ItemId,
        navigation: &str,
        mut request: PageRequest,
        claims: &[Claim],
    ) -> Result<PageResult<ItemView>, CoreError> {
        let navigation = self.descriptor.navigation(navigation)?;
        let children = self.child_ids(parent_id, navigation).await?;

        let children = match &request.id_filter {
            IdFilter::None => children,
            IdFilter::Only(ids) => children.into_iter().filter(|id| ids.contains(id)).collect(),
            IdFilter::Except(ids) => children.into_iter().filter(|id| !ids.contains(id)).collect(),
        };
        request.id_filter = IdFilter::Only(children);

        self.related(&navigation.target)?.get_page(request, claims).await
    }

    /// Attaches `new_child_id` to `parent_id` through this type's reference
    ///
    /// For a one-to-one parent the previous child is displaced: it is
    /// deleted when nothing else owns it (no other reference and no join
    /// membership), otherwise its key is cleared. Returns the displaced id.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the parent or the new child does not exist
    /// - `Validation` if the displaced child is owned elsewhere but its
    ///   reference to the parent is required
    #[instrument(skip(self), fields(data_type = %self.data_type()))]
    pub async fn replace_child(
        &self,
        parent_id: ItemId,
        new_child_id: ItemId,
        navigation: &str,
    ) -> Result<Option<ItemId>, CoreError> {
        let navigation = self.descriptor.navigation(navigation)?;
        let key = reference_key(navigation)?;

        if self.store.get(&navigation.target, parent_id).await?.is_none() {
            return Err(CoreError::item_not_found(&navigation.target, parent_id));
        }
        let new_child = self.require(new_child_id).await?;

        let mut changes = ChangeSet::new();
        stage_attach(&mut changes, new_child, key, parent_id);

        if !self.is_one_to_one(navigation)? {
            changes.commit(self.store.as_ref()).await?;
            return Ok(None);
        }

        let previous = self.current_holder(key, parent_id, new_child_id).await?;
        let Some(mut old) = previous else {
            changes.commit(self.store.as_ref()).await?;
            return Ok(None);
        };

        let old_id = old.id;
        if self.is_orphaned(&old, key).await? {
            self.plan_delete(&mut changes, Arc::clone(&self.descriptor), old_id).await?;
            changes.commit(self.store.as_ref()).await?;
            info!(displaced = %old_id, "Deleted displaced child");
        } else {
            if navigation.is_required() {
                return Err(CoreError::validation(format!(
                    "{} '{}' is owned elsewhere and its '{}' is required",
                    self.data_type(),
                    old_id,
                    navigation.name
                )));
            }
            old.set_foreign_key(key, None);
            changes.update(old);
            changes.commit(self.store.as_ref()).await?;
            info!(displaced = %old_id, "Detached displaced child");
        }
        Ok(Some(old_id))
    }

    /// The child `replace_child` would displace from `parent_id`, if any
    ///
    /// # Errors
    ///
    /// `Schema` if the navigation is unknown or not a reference
    pub async fn displaced_child(
        &self,
        parent_id: ItemId,
        new_child_id: ItemId,
        navigation: &str,
    ) -> Result<Option<ItemId>, CoreError> {
        let navigation = self.descriptor.navigation(navigation)?;
        let key = reference_key(navigation)?;
        if !self.is_one_to_one(navigation)? {
            return Ok(None);
        }
        let holder = self.current_holder(key, parent_id, new_child_id).await?;
        Ok(holder.map(|old| old.id))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn require(&self, id: ItemId) -> Result<DataItem, CoreError> {
        self.find_item(id)
            .await?
            .ok_or_else(|| CoreError::item_not_found(self.data_type(), id))
    }

    fn can_view(&self, claims: &[Claim], id: ItemId) -> bool {
        self.authorizer
            .is_authorized(claims, self.data_type(), Some(id), PermissionLevel::View)
    }

    /// The record other than `except` whose `key` points at `parent_id`
    async fn current_holder(
        &self,
        key: &str,
        parent_id: ItemId,
        except: ItemId,
    ) -> Result<Option<DataItem>, CoreError> {
        Ok(self
            .store
            .find_by_field(self.data_type(), key, &parent_id.to_json())
            .await?
            .into_iter()
            .find(|holder| holder.id != except))
    }

    /// Fails when `parent_id` already has a dependent other than `dependent`
    /// through a one-to-one reference
    async fn ensure_vacant(
        &self,
        navigation: &NavigationDescriptor,
        parent_id: ItemId,
        dependent: ItemId,
    ) -> Result<(), CoreError> {
        let key = reference_key(navigation)?;
        match self.current_holder(key, parent_id, dependent).await? {
            Some(holder) => Err(CoreError::conflict(format!(
                "{} '{}' already has a {} ('{}')",
                navigation.target,
                parent_id,
                self.data_type(),
                holder.id
            ))),
            None => Ok(()),
        }
    }

    /// Key field on the target that backs a one-to-one or one-to-many navigation
    fn inverse_key(&self, navigation: &NavigationDescriptor) -> Result<String, CoreError> {
        let inverse = match &navigation.relationship {
            Relationship::Dependent { inverse } | Relationship::Collection { inverse } => inverse,
            _ => {
                return Err(CoreError::schema(format!(
                    "'{}' is not backed by a key on {}",
                    navigation.name, navigation.target
                )))
            }
        };
        let target = self.registry.get(&navigation.target)?;
        let reference = target.navigation(inverse)?;
        Ok(reference_key(reference)?.to_string())
    }

    /// Whether a reference points at the principal side of a one-to-one
    fn is_one_to_one(&self, navigation: &NavigationDescriptor) -> Result<bool, CoreError> {
        match &navigation.relationship {
            Relationship::Reference { inverse: Some(inverse), .. } => {
                let target = self.registry.get(&navigation.target)?;
                Ok(matches!(
                    target.navigation(inverse)?.relationship,
                    Relationship::Dependent { .. }
                ))
            }
            _ => Ok(false),
        }
    }

    /// Ids of the items behind any navigation of `parent_id`
    async fn child_ids(
        &self,
        parent_id: ItemId,
        navigation: &NavigationDescriptor,
    ) -> Result<Vec<ItemId>, CoreError> {
        let parent_json = parent_id.to_json();
        let ids = match &navigation.relationship {
            Relationship::Reference { foreign_key, .. } => self
                .find_item(parent_id)
                .await?
                .and_then(|parent| parent.foreign_key(foreign_key))
                .into_iter()
                .collect(),
            Relationship::Dependent { .. } | Relationship::Collection { .. } => {
                let key = self.inverse_key(navigation)?;
                self.store
                    .find_by_field(&navigation.target, &key, &parent_json)
                    .await?
                    .iter()
                    .map(|child| child.id)
                    .collect()
            }
            Relationship::ManyToMany { join, local_key, remote_key, .. } => self
                .store
                .find_by_field(join, local_key, &parent_json)
                .await?
                .iter()
                .filter_map(|link| link.foreign_key(remote_key))
                .collect(),
        };
        Ok(ids)
    }

    /// Nothing but the reference through `detached_key` owns the item
    async fn is_orphaned(&self, item: &DataItem, detached_key: &str) -> Result<bool, CoreError> {
        let other_owner = self
            .descriptor
            .references()
            .filter_map(NavigationDescriptor::foreign_key)
            .filter(|key| *key != detached_key)
            .any(|key| item.foreign_key(key).is_some());
        if other_owner {
            return Ok(false);
        }

        for site in self.registry.references_to(self.data_type()) {
            if !self.registry.is_join_type(site.source.name()) {
                continue;
            }
            let memberships = self
                .store
                .find_by_field(site.source.name(), site.foreign_key(), &item.id.to_json())
                .await?;
            if !memberships.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Checks a submitted foreign key and returns its canonical form
    async fn resolve_reference(
        &self,
        navigation: &NavigationDescriptor,
        value: &Value,
    ) -> Result<Value, CoreError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let id = ItemId::from_json(value).ok_or_else(|| {
            CoreError::validation(format!("'{}' must be an identifier", navigation.name))
        })?;
        if self.store.get(&navigation.target, id).await?.is_none() {
            return Err(CoreError::validation(format!(
                "'{}' refers to a missing {} '{}'",
                navigation.name, navigation.target, id
            )));
        }
        Ok(id.to_json())
    }

    /// Stages the deletion of a record and everything that requires it
    ///
    /// Records with an optional reference to a deleted record have the key
    /// cleared. Nothing is written until the change set is committed.
    async fn plan_delete(
        &self,
        changes: &mut ChangeSet,
        descriptor: Arc<EntityDescriptor>,
        id: ItemId,
    ) -> Result<(), CoreError> {
        let mut pending = VecDeque::from([(descriptor, id)]);

        while let Some((descriptor, id)) = pending.pop_front() {
            if changes.is_deleted(descriptor.name(), id) {
                continue;
            }
            changes.delete(descriptor.name(), id);
            debug!(data_type = descriptor.name(), %id, "Staged delete");

            for site in self.registry.references_to(descriptor.name()) {
                let dependents = self
                    .store
                    .find_by_field(site.source.name(), site.foreign_key(), &id.to_json())
                    .await?;
                for dependent in dependents {
                    if site.is_required() {
                        pending.push_back((Arc::clone(&site.source), dependent.id));
                        continue;
                    }
                    if changes.is_deleted(&dependent.data_type, dependent.id) {
                        continue;
                    }
                    let mut dependent = changes
                        .staged(&dependent.data_type, dependent.id)
                        .cloned()
                        .unwrap_or(dependent);
                    if dependent.foreign_key(site.foreign_key()) == Some(id) {
                        dependent.set_foreign_key(site.foreign_key(), None);
                        changes.update(dependent);
                    }
                }
            }
        }

        Ok(())
    }

    fn sort_field(&self, sort_by: Option<&str>) -> Result<Option<String>, CoreError> {
        match sort_by.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(name) if name == self.descriptor.primary_key() => Ok(None),
            Some(name) if self.descriptor.field(name).is_some() => Ok(Some(name.to_string())),
            Some(name) => Err(CoreError::validation(format!(
                "cannot sort {} by unknown field '{}'",
                self.data_type(),
                name
            ))),
        }
    }

    fn matches_search(&self, item: &DataItem, needle: &str) -> bool {
        self.descriptor.searchable_fields().any(|field| {
            item.field(&field.name)
                .as_str()
                .is_some_and(|text| text.to_lowercase().contains(needle))
        })
    }

    /// Projects a record into its view model
    async fn project(&self, item: &DataItem) -> Result<ItemView, CoreError> {
        let mut values = BTreeMap::new();
        values.insert(
            self.descriptor.primary_key().to_string(),
            FieldValue::Value(item.id.to_json()),
        );

        for field in self.descriptor.fields() {
            values.insert(field.name.clone(), FieldValue::Value(item.field(&field.name).clone()));
        }

        for navigation in self.descriptor.navigations() {
            let value = match &navigation.relationship {
                Relationship::Reference { foreign_key, .. } => related(item.foreign_key(foreign_key)),
                Relationship::Dependent { .. } => {
                    let key = self.inverse_key(navigation)?;
                    let children = self
                        .store
                        .find_by_field(&navigation.target, &key, &item.id.to_json())
                        .await?;
                    related(children.first().map(|c| c.id))
                }
                Relationship::Collection { .. } | Relationship::ManyToMany { .. } => {
                    FieldValue::Placeholder(Placeholder::Elided)
                }
            };
            values.insert(navigation.name.clone(), value);
        }

        Ok(ItemView {
            data_type: self.data_type().to_string(),
            primary_key_property: self.descriptor.primary_key().to_string(),
            version: item.version,
            values,
        })
    }
}

fn related(id: Option<ItemId>) -> FieldValue {
    match id {
        Some(id) => FieldValue::Value(id.to_json()),
        None => FieldValue::Placeholder(Placeholder::None),
    }
}

fn stage_attach(changes: &mut ChangeSet, mut child: DataItem, key: &str, parent_id: ItemId) {
    if child.foreign_key(key) != Some(parent_id) {
        child.set_foreign_key(key, Some(parent_id));
        changes.update(child);
    }
}

fn reference_key(navigation: &NavigationDescriptor) -> Result<&str, CoreError> {
    navigation.foreign_key().ok_or_else(|| {
        CoreError::schema(format!(
            "'{}' is not a reference navigation",
            navigation.name
        ))
    })
}

fn not_a_collection(navigation: &NavigationDescriptor) -> CoreError {
    CoreError::schema(format!("'{}' is not a collection navigation", navigation.name))
}

/// Stable sort by a field (or the primary key), ties broken by primary key
fn sort_items(items: &mut [DataItem], field: Option<String>, descending: bool) {
    items.sort_by(|a, b| {
        let ordering = match field.as_deref() {
            Some(field) => compare_values(a.field(field), b.field(field)),
            None => a.id.cmp(&b.id),
        };
        let ordering = if descending { ordering.reverse() } else { ordering };
        ordering.then_with(|| a.id.cmp(&b.id))
    });
}

/// Total order over JSON field values: null, booleans, numbers, then text
/// (case-insensitive first)
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x
            .to_lowercase()
            .cmp(&y.to_lowercase())
            .then_with(|| x.cmp(y)),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item_with(name: Value) -> DataItem {
        let mut fields = Map::new();
        fields.insert("name".to_string(), name);
        DataItem::new("Country", ItemId::new_v7(), fields)
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("apple"), &json!("Banana")), Ordering::Less);
        assert_eq!(compare_values(&Value::Null, &json!(0)), Ordering::Less);
        assert_eq!(compare_values(&json!(false), &json!(true)), Ordering::Less);
    }

    #[test]
    fn test_sort_is_stable_with_key_tie_break() {
        let mut items = vec![
            item_with(json!("b")),
            item_with(json!("a")),
            item_with(json!("b")),
        ];
        let ids: Vec<ItemId> = items.iter().map(|i| i.id).collect();

        sort_items(&mut items, Some("name".to_string()), false);
        assert_eq!(items[0].id, ids[1]);
        assert_eq!(items[1].id, ids[0]);
        assert_eq!(items[2].id, ids[2]);

        sort_items(&mut items, Some("name".to_string()), true);
        assert_eq!(items[0].id, ids[0]);
        assert_eq!(items[1].id, ids[2]);
        assert_eq!(items[2].id, ids[1]);
    }

    #[test]
    fn test_sort_without_field_uses_key() {
        let mut items = vec![item_with(json!("x")), item_with(json!("y"))];
        let first = items[0].id.min(items[1].id);
        sort_items(&mut items, None, false);
        assert_eq!(items[0].id, first);
    }
}
