//! Cached, optimistically-updated views over the vendor's data
//!
//! Each view owns one cache key and follows the same contract:
//!
//! - `mount()` renders from a fresh cache entry when there is one, otherwise
//!   hands back a [`LoadTicket`] for the network fetch.
//! - `apply_fetch()` stores the fetched payload in view state and in the
//!   cache, unless the ticket belongs to an older mount.
//! - Mutations update view state first, then call the backend. Success
//!   invalidates every cache key derived from the mutated entity; failure
//!   restores the pre-mutation snapshot and returns the error.
//!
//! The `begin_*`/`settle` halves of each mutation are public so callers
//! that drive the backend themselves can render the optimistic state while
//! the write is in flight.

pub mod availability;
pub mod dashboard;
pub mod packages;

pub use availability::{AvailabilityData, AvailabilityView, CalendarDay, DayStatus};
pub use dashboard::{DashboardData, DashboardStats, DashboardSummary, DashboardView, PackageCounts};
pub use packages::PackagesView;

use std::collections::{BTreeMap, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::cache::CacheManager;
use crate::data::{BackendError, Booking, Package, ValidationError};

/// Cache key owned by the dashboard view
pub const DASHBOARD_KEY: &str = "dashboard";
/// Cache key owned by the packages view
pub const PACKAGES_KEY: &str = "packages";
/// Cache key owned by the availability view
pub const AVAILABILITY_KEY: &str = "availability";

/// Dashboard entries stay fresh for two minutes
pub const DASHBOARD_TTL_MS: u64 = 120_000;
/// Package entries stay fresh for one minute
pub const PACKAGES_TTL_MS: u64 = 60_000;
/// Availability entries stay fresh for one minute
pub const AVAILABILITY_TTL_MS: u64 = 60_000;

/// Errors returned by view operations
#[derive(Debug, Error)]
pub enum ViewError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Another write to the same entity has not settled yet
    #[error("A change to {0} is still being saved")]
    MutationInFlight(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The entity exists but is not in a state the operation accepts
    #[error("{0}")]
    Conflict(String),

    /// The view has no data to mutate yet
    #[error("The {0} view has not been loaded")]
    NotLoaded(&'static str),
}

/// Kinds of backend records whose mutation invalidates cached views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Package,
    Booking,
    Availability,
}

/// Every cache key holding data derived from `kind`
///
/// Package counts appear on the dashboard, so a package write clears both
/// views together.
pub fn keys_affected_by(kind: EntityKind) -> &'static [&'static str] {
    match kind {
        EntityKind::Package => &[PACKAGES_KEY, DASHBOARD_KEY],
        EntityKind::Booking => &[DASHBOARD_KEY],
        EntityKind::Availability => &[AVAILABILITY_KEY],
    }
}

/// Removes every cache entry derived from `kind`
pub fn invalidate_entity(cache: &CacheManager, kind: EntityKind) {
    for key in keys_affected_by(kind) {
        debug!(cache = key, ?kind, "Invalidating after write");
        cache.remove(key);
    }
}

/// Where a view's current data came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Cache,
    Network,
}

/// Proof that a fetch was started by a particular mount of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

/// Outcome of mounting a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Mount {
    /// Rendered from a fresh cache entry; no fetch needed
    Cached,
    /// Cache missed; fetch and pass the result to `apply_fetch`
    Fetch(LoadTicket),
}

/// An optimistic change awaiting its backend result
///
/// Holds the view state from before the change so it can be restored.
#[derive(Debug)]
#[must_use = "a pending mutation must be settled"]
pub struct Pending<S> {
    entity: String,
    generation: u64,
    snapshot: S,
}

impl<S> Pending<S> {
    /// Identifier of the entity being written
    pub fn entity(&self) -> &str {
        &self.entity
    }
}

/// Mount generation and in-flight writes for one view instance
#[derive(Debug, Default)]
pub struct ViewSync {
    generation: u64,
    in_flight: HashSet<String>,
}

impl ViewSync {
    /// Starts a new mount; results tagged with earlier mounts are ignored
    pub fn remount(&mut self) -> LoadTicket {
        self.generation += 1;
        LoadTicket {
            generation: self.generation,
        }
    }

    /// Detaches the current mount so late results are dropped
    pub fn unmount(&mut self) {
        self.generation += 1;
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.generation == self.generation
    }

    pub fn is_in_flight(&self, entity: &str) -> bool {
        self.in_flight.contains(entity)
    }

    /// Claims `entity` for a write, capturing `snapshot` for rollback
    pub fn begin<S>(
        &mut self,
        entity: impl Into<String>,
        snapshot: S,
    ) -> Result<Pending<S>, ViewError> {
        let entity = entity.into();
        if !self.in_flight.insert(entity.clone()) {
            return Err(ViewError::MutationInFlight(entity));
        }
        Ok(Pending {
            entity,
            generation: self.generation,
            snapshot,
        })
    }

    /// Releases the entity claimed by `pending`
    ///
    /// Returns the snapshot when the mount that started the write is still
    /// current, so the caller may restore it; `None` otherwise.
    pub fn finish<S>(&mut self, pending: Pending<S>) -> Option<S> {
        self.in_flight.remove(&pending.entity);
        (pending.generation == self.generation).then_some(pending.snapshot)
    }
}

/// A record with a stable backend identifier
pub trait Entity {
    fn id(&self) -> &str;
}

impl Entity for Package {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Booking {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Records normalized by id
#[derive(Debug, Clone, PartialEq)]
pub struct EntityStore<T> {
    items: BTreeMap<String, T>,
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|item| (item.id().to_string(), item))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.items.get_mut(id)
    }

    /// Inserts or replaces the record with the same id
    pub fn insert(&mut self, item: T) -> Option<T> {
        self.items.insert(item.id().to_string(), item)
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.items.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }
}

impl<T: Entity + Clone> EntityStore<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn package(id: &str) -> Package {
        Package {
            id: id.to_string(),
            vendor_id: "v1".to_string(),
            name: id.to_uppercase(),
            description: None,
            price_cents: 1_000,
            duration_hours: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_package_writes_clear_dashboard_too() {
        let cache = CacheManager::in_memory();
        cache.set(PACKAGES_KEY, &1u8, 60_000);
        cache.set(DASHBOARD_KEY, &2u8, 60_000);
        cache.set(AVAILABILITY_KEY, &3u8, 60_000);

        invalidate_entity(&cache, EntityKind::Package);

        assert_eq!(cache.get::<u8>(PACKAGES_KEY), None);
        assert_eq!(cache.get::<u8>(DASHBOARD_KEY), None);
        assert_eq!(cache.get::<u8>(AVAILABILITY_KEY), Some(3));
    }

    #[test]
    fn test_availability_writes_leave_other_views() {
        assert_eq!(keys_affected_by(EntityKind::Availability), &[AVAILABILITY_KEY]);
        assert_eq!(keys_affected_by(EntityKind::Booking), &[DASHBOARD_KEY]);
    }

    #[test]
    fn test_begin_rejects_second_write_to_same_entity() {
        let mut sync = ViewSync::default();
        let pending = sync.begin("pkg-1", ()).unwrap();
        assert!(sync.is_in_flight("pkg-1"));
        assert!(matches!(
            sync.begin("pkg-1", ()),
            Err(ViewError::MutationInFlight(id)) if id == "pkg-1"
        ));
        // Other entities are independent
        let other = sync.begin("pkg-2", ()).unwrap();

        assert_eq!(sync.finish(pending), Some(()));
        assert_eq!(sync.finish(other), Some(()));
        assert!(!sync.is_in_flight("pkg-1"));
    }

    #[test]
    fn test_finish_after_unmount_drops_snapshot() {
        let mut sync = ViewSync::default();
        let pending = sync.begin("pkg-1", 5).unwrap();
        sync.unmount();
        assert_eq!(sync.finish(pending), None);
        assert!(!sync.is_in_flight("pkg-1"));
    }

    #[test]
    fn test_remount_invalidates_old_tickets() {
        let mut sync = ViewSync::default();
        let first = sync.remount();
        assert!(sync.is_current(first));
        let second = sync.remount();
        assert!(!sync.is_current(first));
        assert!(sync.is_current(second));
        sync.unmount();
        assert!(!sync.is_current(second));
    }

    #[test]
    fn test_entity_store_normalizes_by_id() {
        let mut store = EntityStore::from_items(vec![package("a"), package("b"), package("a")]);
        assert_eq!(store.len(), 2);

        let mut renamed = package("b");
        renamed.name = "Renamed".to_string();
        assert!(store.insert(renamed).is_some());
        assert_eq!(store.get("b").map(|p| p.name.as_str()), Some("Renamed"));

        assert!(store.remove("a").is_some());
        assert!(!store.contains("a"));
        assert_eq!(store.to_vec().len(), 1);
    }
}
