//! Metadata registry: resolves entity descriptions into cached table
//! descriptors.
//!
//! Resolution validates the entity's declared columns once and publishes the
//! result as an `Arc<TableDescriptor>`. Entries are created lazily, live as
//! long as the registry and are never invalidated.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use aorm_core::{Entity, EntityInfo, MappingError, Result, Settings, TableDescriptor};

/// Cache key: entity identity plus the extend flag in effect when it was
/// resolved, so toggling `support_extend` never serves a stale column list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    entity: TypeId,
    extend: bool,
}

/// Thread-safe cache of resolved table metadata.
///
/// # Example
///
/// ```ignore
/// let registry = MetadataRegistry::new(Arc::new(Settings::default()));
/// let table = registry.resolve::<User>()?;
/// assert_eq!(table.name(), "user");
/// ```
#[derive(Debug)]
pub struct MetadataRegistry {
    settings: Arc<Settings>,
    tables: RwLock<HashMap<CacheKey, Arc<TableDescriptor>>>,
}

impl MetadataRegistry {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// The settings this registry reads `support_extend` from.
    pub fn settings(&self) -> &Arc<Settings> {
        &self.settings
    }

    /// Resolve the table descriptor of `E`.
    ///
    /// The first call for an entity validates its description and caches the
    /// result; later calls return the cached handle without calling
    /// [`Entity::describe`] again. Concurrent first calls publish exactly one
    /// descriptor.
    ///
    /// # Errors
    ///
    /// Returns a mapping error if `E` is not marked as a table or its
    /// columns are invalid. Failures are not cached.
    #[tracing::instrument(level = "trace", skip(self), fields(entity = std::any::type_name::<E>()))]
    pub fn resolve<E: Entity>(&self) -> Result<Arc<TableDescriptor>> {
        let key = CacheKey {
            entity: TypeId::of::<E>(),
            extend: self.settings.support_extend(),
        };

        if let Some(table) = self.read().get(&key) {
            tracing::trace!(table = %table.name(), "metadata cache hit");
            return Ok(Arc::clone(table));
        }

        let mut tables = self.write();
        if let Some(table) = tables.get(&key) {
            tracing::trace!(table = %table.name(), "metadata cache hit after wait");
            return Ok(Arc::clone(table));
        }

        let table = Arc::new(Self::build(&E::describe(), key.extend)?);
        tracing::trace!(
            table = %table.name(),
            columns = table.column_count(),
            extend = key.extend,
            "metadata cache miss, descriptor built"
        );
        tables.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Validate an entity description without caching it.
    ///
    /// With `extend` the base chain's columns are inherited ahead of the
    /// entity's own; the entity's table name is always the one used.
    pub fn build(info: &EntityInfo, extend: bool) -> Result<TableDescriptor> {
        let Some(table) = info.table else {
            return Err(MappingError::not_a_table(info.type_name).into());
        };
        let columns = info.collect_columns(extend);
        TableDescriptor::from_specs(info.type_name, table, &columns)
    }

    /// Whether `E` has been resolved under the current extend setting.
    pub fn is_cached<E: Entity>(&self) -> bool {
        let key = CacheKey {
            entity: TypeId::of::<E>(),
            extend: self.settings.support_extend(),
        };
        self.read().contains_key(&key)
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // Entries are inserted fully built, so a poisoned lock still guards a
    // consistent map.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<CacheKey, Arc<TableDescriptor>>> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<CacheKey, Arc<TableDescriptor>>> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}
