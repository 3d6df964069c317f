//! Package list view
//!
//! Lists the vendor's packages from the `packages` cache entry (fresh for
//! one minute) and applies add/edit/delete optimistically.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{
    invalidate_entity, EntityKind, EntityStore, LoadSource, LoadTicket, Mount, Pending, ViewError,
    ViewSync, PACKAGES_KEY, PACKAGES_TTL_MS,
};
use crate::cache::CacheManager;
use crate::data::{BackendError, NewPackage, Package, PackageUpdate, VendorBackend};

/// Prefix for ids of packages that exist only locally until created
pub const PENDING_ID_PREFIX: &str = "pending-";

/// Previous version of the written package; `None` if it did not exist
pub type PackageSnapshot = Option<Package>;

#[derive(Debug)]
pub struct PackagesView {
    cache: CacheManager,
    vendor_id: String,
    packages: EntityStore<Package>,
    source: Option<LoadSource>,
    sync: ViewSync,
    next_temp_id: u64,
}

impl PackagesView {
    pub fn new(cache: CacheManager, vendor_id: impl Into<String>) -> Self {
        let vendor_id = vendor_id.into();
        Self {
            cache: cache.scoped(&vendor_id),
            vendor_id,
            packages: EntityStore::default(),
            source: None,
            sync: ViewSync::default(),
            next_temp_id: 0,
        }
    }

    pub fn vendor_id(&self) -> &str {
        &self.vendor_id
    }

    /// Where the current list came from; `None` before the first load
    pub fn source(&self) -> Option<LoadSource> {
        self.source
    }

    /// Packages ordered by creation time, then name
    pub fn packages(&self) -> Vec<&Package> {
        let mut packages: Vec<&Package> = self.packages.iter().collect();
        packages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        packages
    }

    pub fn get(&self, id: &str) -> Option<&Package> {
        self.packages.get(id)
    }

    /// Renders from the cache if possible, otherwise asks for a fetch
    pub fn mount(&mut self) -> Mount {
        let ticket = self.sync.remount();
        match self.cache.get::<Vec<Package>>(PACKAGES_KEY) {
            Some(packages) => {
                debug!(count = packages.len(), "Packages served from cache");
                self.packages = EntityStore::from_items(packages);
                self.source = Some(LoadSource::Cache);
                Mount::Cached
            }
            None => {
                self.packages = EntityStore::default();
                self.source = None;
                Mount::Fetch(ticket)
            }
        }
    }

    /// Stores a fetched list; returns `false` if the ticket is from an older mount
    pub fn apply_fetch(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<Package>, BackendError>,
    ) -> Result<bool, ViewError> {
        if !self.sync.is_current(ticket) {
            debug!("Dropping package fetch for a previous mount");
            return Ok(false);
        }

        self.packages = EntityStore::from_items(result?);
        let ordered: Vec<Package> = self.packages().into_iter().cloned().collect();
        self.cache.set(PACKAGES_KEY, &ordered, PACKAGES_TTL_MS);
        self.source = Some(LoadSource::Network);
        Ok(true)
    }

    /// Mounts and, on a cache miss, fetches from `backend`
    pub async fn load<B: VendorBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<LoadSource, ViewError> {
        match self.mount() {
            Mount::Cached => Ok(LoadSource::Cache),
            Mount::Fetch(ticket) => {
                let result = backend.list_packages(&self.vendor_id).await;
                self.apply_fetch(ticket, result)?;
                Ok(LoadSource::Network)
            }
        }
    }

    /// Drops results of any fetch or write still in flight
    pub fn unmount(&mut self) {
        self.sync.unmount();
    }

    // ===== Add =====

    /// Shows `package` under a temporary id until the backend assigns one
    pub fn begin_add(
        &mut self,
        package: &NewPackage,
    ) -> Result<Pending<PackageSnapshot>, ViewError> {
        package.validate()?;

        self.next_temp_id += 1;
        let temp_id = format!("{}{}", PENDING_ID_PREFIX, self.next_temp_id);
        let pending = self.sync.begin(temp_id.clone(), None)?;

        let created_at = DateTime::<Utc>::from_timestamp_millis(self.cache.clock().now_ms())
            .unwrap_or_else(Utc::now);
        self.packages.insert(Package {
            id: temp_id,
            vendor_id: self.vendor_id.clone(),
            name: package.name.trim().to_string(),
            description: package.description.clone(),
            price_cents: package.price_cents,
            duration_hours: package.duration_hours,
            is_active: package.is_active,
            created_at,
        });
        Ok(pending)
    }

    /// Swaps the temporary package for the created one, or removes it on failure
    pub fn settle_add(
        &mut self,
        pending: Pending<PackageSnapshot>,
        result: Result<Package, BackendError>,
    ) -> Result<Package, ViewError> {
        let temp_id = pending.entity().to_string();
        let (created, current) = self.settle(pending, result)?;
        if current {
            self.packages.remove(&temp_id);
            self.packages.insert(created.clone());
        }
        Ok(created)
    }

    pub async fn add_package<B: VendorBackend + ?Sized>(
        &mut self,
        backend: &B,
        package: NewPackage,
    ) -> Result<Package, ViewError> {
        let pending = self.begin_add(&package)?;
        let result = backend.create_package(&self.vendor_id, &package).await;
        self.settle_add(pending, result)
    }

    // ===== Update =====

    pub fn begin_update(
        &mut self,
        id: &str,
        update: &PackageUpdate,
    ) -> Result<Pending<PackageSnapshot>, ViewError> {
        update.validate()?;
        let existing = self
            .packages
            .get(id)
            .cloned()
            .ok_or_else(|| ViewError::NotFound(format!("package {}", id)))?;

        let pending = self.sync.begin(id, Some(existing))?;
        if let Some(package) = self.packages.get_mut(id) {
            package.apply(update);
        }
        Ok(pending)
    }

    pub fn settle_update(
        &mut self,
        pending: Pending<PackageSnapshot>,
        result: Result<Package, BackendError>,
    ) -> Result<Package, ViewError> {
        let (updated, current) = self.settle(pending, result)?;
        if current {
            self.packages.insert(updated.clone());
        }
        Ok(updated)
    }

    pub async fn update_package<B: VendorBackend + ?Sized>(
        &mut self,
        backend: &B,
        id: &str,
        update: PackageUpdate,
    ) -> Result<Package, ViewError> {
        let pending = self.begin_update(id, &update)?;
        let result = backend.update_package(id, &update).await;
        self.settle_update(pending, result)
    }

    // ===== Delete =====

    pub fn begin_delete(&mut self, id: &str) -> Result<Pending<PackageSnapshot>, ViewError> {
        let existing = self
            .packages
            .get(id)
            .cloned()
            .ok_or_else(|| ViewError::NotFound(format!("package {}", id)))?;

        let pending = self.sync.begin(id, Some(existing))?;
        self.packages.remove(id);
        Ok(pending)
    }

    pub fn settle_delete(
        &mut self,
        pending: Pending<PackageSnapshot>,
        result: Result<(), BackendError>,
    ) -> Result<(), ViewError> {
        self.settle(pending, result).map(|_| ())
    }

    pub async fn delete_package<B: VendorBackend + ?Sized>(
        &mut self,
        backend: &B,
        id: &str,
    ) -> Result<(), ViewError> {
        let pending = self.begin_delete(id)?;
        let result = backend.delete_package(id).await;
        self.settle_delete(pending, result)
    }

    /// Invalidates on success, restores the previous package on failure
    ///
    /// Returns the backend value and whether the starting mount is still current.
    fn settle<T>(
        &mut self,
        pending: Pending<PackageSnapshot>,
        result: Result<T, BackendError>,
    ) -> Result<(T, bool), ViewError> {
        let id = pending.entity().to_string();
        let snapshot = self.sync.finish(pending);

        match result {
            Ok(value) => {
                invalidate_entity(&self.cache, EntityKind::Package);
                Ok((value, snapshot.is_some()))
            }
            Err(e) => {
                warn!(package = %id, error = %e, "Package write failed, rolling back");
                match snapshot {
                    Some(Some(previous)) => {
                        self.packages.insert(previous);
                    }
                    Some(None) => {
                        self.packages.remove(&id);
                    }
                    None => {}
                }
                Err(e.into())
            }
        }
    }
}
