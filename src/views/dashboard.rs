//! Vendor dashboard view
//!
//! The dashboard combines the vendor's bookings with package counts. The
//! combined payload is cached under `dashboard` for two minutes; summary
//! figures are derived from it on every render so optimistic changes to a
//! booking show up in the counts immediately.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    invalidate_entity, EntityKind, EntityStore, LoadSource, LoadTicket, Mount, Pending, ViewError,
    ViewSync, DASHBOARD_KEY, DASHBOARD_TTL_MS,
};
use crate::cache::CacheManager;
use crate::data::{BackendError, Booking, BookingStatus, Package, VendorBackend};

/// Pending requests listed on the dashboard
const RECENT_REQUESTS_LIMIT: usize = 5;

/// Active and total package counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageCounts {
    pub active: usize,
    pub total: usize,
}

impl PackageCounts {
    pub fn from_packages(packages: &[Package]) -> Self {
        Self {
            active: packages.iter().filter(|p| p.is_active).count(),
            total: packages.len(),
        }
    }
}

/// Payload cached for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub bookings: Vec<Booking>,
    pub packages: PackageCounts,
}

/// Headline numbers shown on the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardStats {
    /// Requests waiting for a response
    pub pending_requests: usize,
    /// Confirmed bookings on or after today
    pub upcoming_bookings: usize,
    pub active_packages: usize,
    pub total_packages: usize,
    /// Total of confirmed and completed bookings, in cents
    pub confirmed_revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub stats: DashboardStats,
    /// Newest pending requests first
    pub recent_requests: Vec<Booking>,
    /// Earliest confirmed booking on or after today
    pub next_booking: Option<Booking>,
}

impl DashboardSummary {
    pub fn from_bookings<'a>(
        bookings: impl IntoIterator<Item = &'a Booking>,
        packages: PackageCounts,
        today: NaiveDate,
    ) -> Self {
        let mut stats = DashboardStats {
            active_packages: packages.active,
            total_packages: packages.total,
            ..Default::default()
        };
        let mut requests: Vec<&Booking> = Vec::new();
        let mut next_booking: Option<&Booking> = None;

        for booking in bookings {
            match booking.status {
                BookingStatus::Pending => {
                    stats.pending_requests += 1;
                    requests.push(booking);
                }
                BookingStatus::Confirmed => {
                    stats.confirmed_revenue_cents += booking.total_cents;
                    if booking.event_date >= today {
                        stats.upcoming_bookings += 1;
                        if next_booking.map_or(true, |next| booking.event_date < next.event_date) {
                            next_booking = Some(booking);
                        }
                    }
                }
                BookingStatus::Completed => stats.confirmed_revenue_cents += booking.total_cents,
                BookingStatus::Declined | BookingStatus::Cancelled => {}
            }
        }

        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            stats,
            recent_requests: requests
                .into_iter()
                .take(RECENT_REQUESTS_LIMIT)
                .cloned()
                .collect(),
            next_booking: next_booking.cloned(),
        }
    }
}

#[derive(Debug)]
pub struct DashboardView {
    cache: CacheManager,
    vendor_id: String,
    bookings: EntityStore<Booking>,
    packages: PackageCounts,
    source: Option<LoadSource>,
    sync: ViewSync,
}

impl DashboardView {
    pub fn new(cache: CacheManager, vendor_id: impl Into<String>) -> Self {
        let vendor_id = vendor_id.into();
        Self {
            cache: cache.scoped(&vendor_id),
            vendor_id,
            bookings: EntityStore::default(),
            packages: PackageCounts::default(),
            source: None,
            sync: ViewSync::default(),
        }
    }

    pub fn source(&self) -> Option<LoadSource> {
        self.source
    }

    pub fn booking(&self, id: &str) -> Option<&Booking> {
        self.bookings.get(id)
    }

    /// Summary relative to the cache clock's current date; `None` before loading
    pub fn summary(&self) -> Option<DashboardSummary> {
        self.source?;
        Some(DashboardSummary::from_bookings(
            self.bookings.iter(),
            self.packages,
            self.cache.clock().today(),
        ))
    }

    fn replace(&mut self, data: DashboardData) {
        self.bookings = EntityStore::from_items(data.bookings);
        self.packages = data.packages;
    }

    pub fn mount(&mut self) -> Mount {
        let ticket = self.sync.remount();
        match self.cache.get::<DashboardData>(DASHBOARD_KEY) {
            Some(data) => {
                debug!(bookings = data.bookings.len(), "Dashboard served from cache");
                self.replace(data);
                self.source = Some(LoadSource::Cache);
                Mount::Cached
            }
            None => {
                self.bookings = EntityStore::default();
                self.packages = PackageCounts::default();
                self.source = None;
                Mount::Fetch(ticket)
            }
        }
    }

    /// Stores fetched bookings and packages; `false` if the ticket is stale
    pub fn apply_fetch(
        &mut self,
        ticket: LoadTicket,
        result: Result<(Vec<Booking>, Vec<Package>), BackendError>,
    ) -> Result<bool, ViewError> {
        if !self.sync.is_current(ticket) {
            debug!("Dropping dashboard fetch for a previous mount");
            return Ok(false);
        }

        let (mut bookings, packages) = result?;
        bookings.sort_by_key(|b| b.event_date);
        let data = DashboardData {
            bookings,
            packages: PackageCounts::from_packages(&packages),
        };
        self.cache.set(DASHBOARD_KEY, &data, DASHBOARD_TTL_MS);
        self.replace(data);
        self.source = Some(LoadSource::Network);
        Ok(true)
    }

    /// Fetches bookings and packages concurrently on a cache miss
    pub async fn load<B: VendorBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<LoadSource, ViewError> {
        match self.mount() {
            Mount::Cached => Ok(LoadSource::Cache),
            Mount::Fetch(ticket) => {
                let result = futures::try_join!(
                    backend.list_bookings(&self.vendor_id),
                    backend.list_packages(&self.vendor_id),
                );
                self.apply_fetch(ticket, result)?;
                Ok(LoadSource::Network)
            }
        }
    }

    pub fn unmount(&mut self) {
        self.sync.unmount();
    }

    /// Marks a pending request confirmed (or declined) before the backend answers
    pub fn begin_respond(
        &mut self,
        booking_id: &str,
        accept: bool,
    ) -> Result<Pending<Booking>, ViewError> {
        let existing = self
            .bookings
            .get(booking_id)
            .cloned()
            .ok_or_else(|| ViewError::NotFound(format!("booking {}", booking_id)))?;
        if existing.status != BookingStatus::Pending {
            return Err(ViewError::Conflict(format!(
                "Booking {} is already {}",
                booking_id,
                existing.status.as_str()
            )));
        }

        let pending = self.sync.begin(booking_id, existing)?;
        if let Some(booking) = self.bookings.get_mut(booking_id) {
            booking.status = response_status(accept);
        }
        Ok(pending)
    }

    pub fn settle_respond(
        &mut self,
        pending: Pending<Booking>,
        result: Result<Booking, BackendError>,
    ) -> Result<Booking, ViewError> {
        let id = pending.entity().to_string();
        let snapshot = self.sync.finish(pending);

        match result {
            Ok(booking) => {
                invalidate_entity(&self.cache, EntityKind::Booking);
                if snapshot.is_some() {
                    self.bookings.insert(booking.clone());
                }
                Ok(booking)
            }
            Err(e) => {
                warn!(booking = %id, error = %e, "Booking response failed, rolling back");
                if let Some(previous) = snapshot {
                    self.bookings.insert(previous);
                }
                Err(e.into())
            }
        }
    }

    pub async fn respond_to_request<B: VendorBackend + ?Sized>(
        &mut self,
        backend: &B,
        booking_id: &str,
        accept: bool,
    ) -> Result<Booking, ViewError> {
        let pending = self.begin_respond(booking_id, accept)?;
        let result = backend
            .update_booking_status(booking_id, response_status(accept))
            .await;
        self.settle_respond(pending, result)
    }
}

fn response_status(accept: bool) -> BookingStatus {
    if accept {
        BookingStatus::Confirmed
    } else {
        BookingStatus::Declined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::data::MemoryBackend;
    use crate::views::PACKAGES_KEY;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    const VENDOR: &str = "vendor-1";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 10).unwrap()
    }

    fn booking(id: &str, status: BookingStatus, days_from_today: i64, total: i64) -> Booking {
        Booking {
            id: id.to_string(),
            vendor_id: VENDOR.to_string(),
            package_id: None,
            client_name: format!("Client {}", id),
            event_date: today() + Duration::days(days_from_today),
            status,
            total_cents: total,
            created_at: Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
                + Duration::hours(days_from_today.abs()),
        }
    }

    fn setup() -> (DashboardView, MemoryBackend, CacheManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_date(today()));
        let cache = CacheManager::in_memory().with_clock(clock.clone());
        let backend = MemoryBackend::new();
        backend.seed_booking(booking("r1", BookingStatus::Pending, 30, 100_000));
        backend.seed_booking(booking("r2", BookingStatus::Pending, 40, 80_000));
        backend.seed_booking(booking("c1", BookingStatus::Confirmed, 5, 200_000));
        backend.seed_booking(booking("c2", BookingStatus::Confirmed, -3, 150_000));
        backend.seed_booking(booking("d1", BookingStatus::Declined, 7, 90_000));
        let view = DashboardView::new(cache.clone(), VENDOR);
        (view, backend, cache.scoped(VENDOR), clock)
    }

    #[test]
    fn test_summary_counts() {
        let bookings = vec![
            booking("r1", BookingStatus::Pending, 30, 100_000),
            booking("c1", BookingStatus::Confirmed, 5, 200_000),
            booking("c0", BookingStatus::Confirmed, 0, 10_000),
            booking("c2", BookingStatus::Confirmed, -3, 150_000),
            booking("x1", BookingStatus::Completed, -30, 50_000),
            booking("x2", BookingStatus::Cancelled, 9, 70_000),
        ];
        let summary = DashboardSummary::from_bookings(
            &bookings,
            PackageCounts { active: 2, total: 3 },
            today(),
        );

        assert_eq!(summary.stats.pending_requests, 1);
        assert_eq!(summary.stats.upcoming_bookings, 2, "Today counts as upcoming");
        assert_eq!(summary.stats.confirmed_revenue_cents, 410_000);
        assert_eq!(summary.stats.active_packages, 2);
        assert_eq!(summary.stats.total_packages, 3);
        assert_eq!(summary.next_booking.map(|b| b.id), Some("c0".to_string()));
    }

    #[test]
    fn test_recent_requests_are_newest_first_and_limited() {
        let bookings: Vec<Booking> = (1..=7)
            .map(|i| booking(&format!("r{}", i), BookingStatus::Pending, i, 1_000))
            .collect();
        let summary = DashboardSummary::from_bookings(&bookings, PackageCounts::default(), today());

        assert_eq!(summary.stats.pending_requests, 7);
        let ids: Vec<&str> = summary.recent_requests.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["r7", "r6", "r5", "r4", "r3"]);
    }

    #[tokio::test]
    async fn test_load_caches_for_two_minutes() {
        let (mut view, backend, _cache, clock) = setup();
        assert!(view.summary().is_none());

        assert_eq!(view.load(&backend).await.unwrap(), LoadSource::Network);
        let reads_after_first = backend.read_count();
        assert_eq!(reads_after_first, 2, "Bookings and packages fetched together");

        clock.advance(DASHBOARD_TTL_MS as i64 - 1);
        assert_eq!(view.load(&backend).await.unwrap(), LoadSource::Cache);
        assert_eq!(backend.read_count(), reads_after_first);

        clock.advance(2);
        assert_eq!(view.load(&backend).await.unwrap(), LoadSource::Network);
    }

    #[tokio::test]
    async fn test_accept_updates_counts_immediately() {
        let (mut view, backend, cache, _clock) = setup();
        view.load(&backend).await.unwrap();
        cache.set(PACKAGES_KEY, &"untouched", 60_000);
        assert_eq!(view.summary().unwrap().stats.pending_requests, 2);

        let pending = view.begin_respond("r1", true).unwrap();
        let stats = view.summary().unwrap().stats;
        assert_eq!(stats.pending_requests, 1);
        assert_eq!(stats.upcoming_bookings, 2);

        let result = backend
            .update_booking_status("r1", BookingStatus::Confirmed)
            .await;
        view.settle_respond(pending, result).unwrap();

        assert!(cache.get::<DashboardData>(DASHBOARD_KEY).is_none());
        assert_eq!(cache.get::<String>(PACKAGES_KEY).as_deref(), Some("untouched"));
    }

    #[tokio::test]
    async fn test_failed_decline_restores_request() {
        let (mut view, backend, _cache, _clock) = setup();
        view.load(&backend).await.unwrap();
        backend.set_fail_writes(true);

        let err = view.respond_to_request(&backend, "r2", false).await.unwrap_err();
        assert!(matches!(err, ViewError::Backend(_)));
        assert_eq!(view.booking("r2").unwrap().status, BookingStatus::Pending);
        assert_eq!(view.summary().unwrap().stats.pending_requests, 2);
    }

    #[tokio::test]
    async fn test_respond_rejects_non_pending_and_unknown() {
        let (mut view, backend, _cache, _clock) = setup();
        view.load(&backend).await.unwrap();

        assert!(matches!(view.begin_respond("c1", true), Err(ViewError::Conflict(_))));
        assert!(matches!(view.begin_respond("zzz", true), Err(ViewError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_dashboard_reflects_package_counts() {
        let (mut view, backend, _cache, _clock) = setup();
        backend.seed_package(Package {
            id: "p1".to_string(),
            vendor_id: VENDOR.to_string(),
            name: "Basic".to_string(),
            description: None,
            price_cents: 1,
            duration_hours: None,
            is_active: false,
            created_at: Utc::now(),
        });
        view.load(&backend).await.unwrap();

        let stats = view.summary().unwrap().stats;
        assert_eq!(stats.total_packages, 1);
        assert_eq!(stats.active_packages, 0);
    }
}
