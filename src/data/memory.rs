//! In-memory backend with failure injection
//!
//! Behaves like the hosted database for a single process: ids are assigned
//! sequentially and every table lives in a `Mutex`. Reads and writes can be
//! made to fail on demand, and the number of read calls is counted so tests
//! can tell a cache hit from a network fetch.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use super::backend::{BackendError, VendorBackend};
use super::{
    AvailabilitySettings, BlockedDate, Booking, BookingStatus, NewPackage, Package, PackageUpdate,
};

#[derive(Debug, Default)]
struct Tables {
    packages: Vec<Package>,
    bookings: Vec<Booking>,
    blocked_dates: BTreeMap<(String, NaiveDate), BlockedDate>,
    settings: HashMap<String, AvailabilitySettings>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a package row as-is
    pub fn seed_package(&self, package: Package) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.packages.push(package);
        }
    }

    /// Inserts a booking row as-is
    pub fn seed_booking(&self, booking: Booking) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.bookings.push(booking);
        }
    }

    /// Makes every subsequent read fail (or succeed again)
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent write fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of read calls served so far
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Current package rows for `vendor_id`
    pub fn stored_packages(&self, vendor_id: &str) -> Vec<Package> {
        self.tables
            .lock()
            .map(|t| {
                t.packages
                    .iter()
                    .filter(|p| p.vendor_id == vendor_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, BackendError> {
        self.tables
            .lock()
            .map_err(|_| BackendError::ServerError("table lock poisoned".to_string()))
    }

    fn begin_read(&self) -> Result<MutexGuard<'_, Tables>, BackendError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BackendError::ServerError("injected read failure".to_string()));
        }
        self.tables()
    }

    fn begin_write(&self) -> Result<MutexGuard<'_, Tables>, BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::ServerError("injected write failure".to_string()));
        }
        self.tables()
    }
}

#[async_trait]
impl VendorBackend for MemoryBackend {
    async fn list_packages(&self, vendor_id: &str) -> Result<Vec<Package>, BackendError> {
        let tables = self.begin_read()?;
        Ok(tables
            .packages
            .iter()
            .filter(|p| p.vendor_id == vendor_id)
            .cloned()
            .collect())
    }

    async fn create_package(
        &self,
        vendor_id: &str,
        package: &NewPackage,
    ) -> Result<Package, BackendError> {
        let mut tables = self.begin_write()?;
        let created = Package {
            id: tables.next_id("pkg"),
            vendor_id: vendor_id.to_string(),
            name: package.name.trim().to_string(),
            description: package.description.clone(),
            price_cents: package.price_cents,
            duration_hours: package.duration_hours,
            is_active: package.is_active,
            created_at: Utc::now(),
        };
        tables.packages.push(created.clone());
        Ok(created)
    }

    async fn update_package(
        &self,
        package_id: &str,
        update: &PackageUpdate,
    ) -> Result<Package, BackendError> {
        let mut tables = self.begin_write()?;
        let package = tables
            .packages
            .iter_mut()
            .find(|p| p.id == package_id)
            .ok_or_else(|| BackendError::NotFound(format!("package {}", package_id)))?;
        package.apply(update);
        Ok(package.clone())
    }

    async fn delete_package(&self, package_id: &str) -> Result<(), BackendError> {
        let mut tables = self.begin_write()?;
        let before = tables.packages.len();
        tables.packages.retain(|p| p.id != package_id);
        if tables.packages.len() == before {
            return Err(BackendError::NotFound(format!("package {}", package_id)));
        }
        Ok(())
    }

    async fn list_bookings(&self, vendor_id: &str) -> Result<Vec<Booking>, BackendError> {
        let tables = self.begin_read()?;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .iter()
            .filter(|b| b.vendor_id == vendor_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.event_date);
        Ok(bookings)
    }

    async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<Booking, BackendError> {
        let mut tables = self.begin_write()?;
        let booking = tables
            .bookings
            .iter_mut()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| BackendError::NotFound(format!("booking {}", booking_id)))?;
        booking.status = status;
        Ok(booking.clone())
    }

    async fn list_blocked_dates(&self, vendor_id: &str) -> Result<Vec<BlockedDate>, BackendError> {
        let tables = self.begin_read()?;
        Ok(tables
            .blocked_dates
            .iter()
            .filter(|((vendor, _), _)| vendor == vendor_id)
            .map(|(_, blocked)| blocked.clone())
            .collect())
    }

    async fn block_date(
        &self,
        vendor_id: &str,
        date: NaiveDate,
        reason: Option<&str>,
    ) -> Result<BlockedDate, BackendError> {
        let mut tables = self.begin_write()?;
        let key = (vendor_id.to_string(), date);
        if tables.blocked_dates.contains_key(&key) {
            return Err(BackendError::Conflict(format!("{} already blocked", date)));
        }
        let blocked = BlockedDate {
            date,
            reason: reason.map(str::to_string),
        };
        tables.blocked_dates.insert(key, blocked.clone());
        Ok(blocked)
    }

    async fn unblock_date(&self, vendor_id: &str, date: NaiveDate) -> Result<(), BackendError> {
        let mut tables = self.begin_write()?;
        tables.blocked_dates.remove(&(vendor_id.to_string(), date));
        Ok(())
    }

    async fn get_availability_settings(
        &self,
        vendor_id: &str,
    ) -> Result<Option<AvailabilitySettings>, BackendError> {
        let tables = self.begin_read()?;
        Ok(tables.settings.get(vendor_id).cloned())
    }

    async fn save_availability_settings(
        &self,
        vendor_id: &str,
        settings: &AvailabilitySettings,
    ) -> Result<AvailabilitySettings, BackendError> {
        let mut tables = self.begin_write()?;
        tables
            .settings
            .insert(vendor_id.to_string(), settings.clone());
        Ok(settings.clone())
    }
}
