//! Availability calendar view
//!
//! Holds the vendor's weekly rules and blocked dates, cached together under
//! `availability` for one minute. Blocking, unblocking and saving settings
//! are applied optimistically.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    invalidate_entity, EntityKind, LoadSource, LoadTicket, Mount, Pending, ViewError, ViewSync,
    AVAILABILITY_KEY, AVAILABILITY_TTL_MS,
};
use crate::cache::CacheManager;
use crate::data::{AvailabilitySettings, BackendError, BlockedDate, ValidationError, VendorBackend};

/// In-flight key for settings writes
const SETTINGS_ENTITY: &str = "settings";

/// Payload cached for the availability view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityData {
    pub settings: AvailabilitySettings,
    /// Sorted by date, one entry per date
    pub blocked_dates: Vec<BlockedDate>,
}

impl AvailabilityData {
    pub fn new(settings: AvailabilitySettings, mut blocked_dates: Vec<BlockedDate>) -> Self {
        blocked_dates.sort_by_key(|b| b.date);
        blocked_dates.dedup_by_key(|b| b.date);
        Self {
            settings,
            blocked_dates,
        }
    }

    pub fn blocked(&self, date: NaiveDate) -> Option<&BlockedDate> {
        self.blocked_dates
            .binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| &self.blocked_dates[i])
    }

    fn insert_blocked(&mut self, blocked: BlockedDate) {
        match self.blocked_dates.binary_search_by_key(&blocked.date, |b| b.date) {
            Ok(i) => self.blocked_dates[i] = blocked,
            Err(i) => self.blocked_dates.insert(i, blocked),
        }
    }

    fn remove_blocked(&mut self, date: NaiveDate) -> Option<BlockedDate> {
        self.blocked_dates
            .binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|i| self.blocked_dates.remove(i))
    }

    /// Classifies `date` as seen on `today`
    pub fn day_status(&self, date: NaiveDate, today: NaiveDate) -> DayStatus {
        if date < today {
            return DayStatus::Past;
        }
        if self.blocked(date).is_some() {
            return DayStatus::Blocked;
        }
        if !self.settings.works_on(date.weekday()) {
            return DayStatus::NonWorking;
        }
        let earliest = today.checked_add_days(Days::new(u64::from(self.settings.lead_time_days)));
        match earliest {
            Some(earliest) if date >= earliest => DayStatus::Available,
            _ => DayStatus::InsideLeadTime,
        }
    }
}

/// Bookability of a calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Past,
    /// Explicitly blocked by the vendor
    Blocked,
    /// Not one of the vendor's working days
    NonWorking,
    /// Too soon given the vendor's lead time
    InsideLeadTime,
    Available,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::Past => "past",
            DayStatus::Blocked => "blocked",
            DayStatus::NonWorking => "closed",
            DayStatus::InsideLeadTime => "too soon",
            DayStatus::Available => "available",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub status: DayStatus,
    /// Why the day is blocked, when a reason was given
    pub reason: Option<String>,
}

/// Prior state of whatever an availability write touched
#[derive(Debug, Clone, PartialEq)]
pub enum AvailabilitySnapshot {
    /// A date and its blocked entry, if it had one
    Date(NaiveDate, Option<BlockedDate>),
    Settings(AvailabilitySettings),
}

#[derive(Debug)]
pub struct AvailabilityView {
    cache: CacheManager,
    vendor_id: String,
    data: Option<AvailabilityData>,
    source: Option<LoadSource>,
    sync: ViewSync,
}

impl AvailabilityView {
    pub fn new(cache: CacheManager, vendor_id: impl Into<String>) -> Self {
        let vendor_id = vendor_id.into();
        Self {
            cache: cache.scoped(&vendor_id),
            vendor_id,
            data: None,
            source: None,
            sync: ViewSync::default(),
        }
    }

    pub fn source(&self) -> Option<LoadSource> {
        self.source
    }

    pub fn data(&self) -> Option<&AvailabilityData> {
        self.data.as_ref()
    }

    fn today(&self) -> NaiveDate {
        self.cache.clock().today()
    }

    pub fn mount(&mut self) -> Mount {
        let ticket = self.sync.remount();
        match self.cache.get::<AvailabilityData>(AVAILABILITY_KEY) {
            Some(data) => {
                debug!(blocked = data.blocked_dates.len(), "Availability served from cache");
                self.data = Some(data);
                self.source = Some(LoadSource::Cache);
                Mount::Cached
            }
            None => {
                self.data = None;
                self.source = None;
                Mount::Fetch(ticket)
            }
        }
    }

    /// Stores fetched settings and blocked dates; `false` if the ticket is stale
    ///
    /// A vendor without saved settings gets the defaults.
    pub fn apply_fetch(
        &mut self,
        ticket: LoadTicket,
        result: Result<(Option<AvailabilitySettings>, Vec<BlockedDate>), BackendError>,
    ) -> Result<bool, ViewError> {
        if !self.sync.is_current(ticket) {
            debug!("Dropping availability fetch for a previous mount");
            return Ok(false);
        }

        let (settings, blocked_dates) = result?;
        let data = AvailabilityData::new(settings.unwrap_or_default(), blocked_dates);
        self.cache.set(AVAILABILITY_KEY, &data, AVAILABILITY_TTL_MS);
        self.data = Some(data);
        self.source = Some(LoadSource::Network);
        Ok(true)
    }

    pub async fn load<B: VendorBackend + ?Sized>(
        &mut self,
        backend: &B,
    ) -> Result<LoadSource, ViewError> {
        match self.mount() {
            Mount::Cached => Ok(LoadSource::Cache),
            Mount::Fetch(ticket) => {
                let result = futures::try_join!(
                    backend.get_availability_settings(&self.vendor_id),
                    backend.list_blocked_dates(&self.vendor_id),
                );
                self.apply_fetch(ticket, result)?;
                Ok(LoadSource::Network)
            }
        }
    }

    pub fn unmount(&mut self) {
        self.sync.unmount();
    }

    /// Classifies `days` consecutive dates starting at `from`
    pub fn calendar(&self, from: NaiveDate, days: usize) -> Result<Vec<CalendarDay>, ViewError> {
        let data = self.data.as_ref().ok_or(ViewError::NotLoaded("availability"))?;
        let today = self.today();
        Ok(from
            .iter_days()
            .take(days)
            .map(|date| CalendarDay {
                date,
                status: data.day_status(date, today),
                reason: data.blocked(date).and_then(|b| b.reason.clone()),
            })
            .collect())
    }

    fn data_mut(&mut self) -> Result<&mut AvailabilityData, ViewError> {
        self.data.as_mut().ok_or(ViewError::NotLoaded("availability"))
    }

    // ===== Block / unblock =====

    /// Marks `date` blocked locally
    ///
    /// Returns `None` when the date is already blocked; there is nothing to
    /// write in that case.
    pub fn begin_block(
        &mut self,
        date: NaiveDate,
        reason: Option<&str>,
    ) -> Result<Option<Pending<AvailabilitySnapshot>>, ViewError> {
        let today = self.today();
        if date < today {
            return Err(ValidationError::PastDate(date).into());
        }
        if self.data_mut()?.blocked(date).is_some() {
            debug!(%date, "Date already blocked");
            return Ok(None);
        }

        let pending = self
            .sync
            .begin(date.to_string(), AvailabilitySnapshot::Date(date, None))?;
        self.data_mut()?.insert_blocked(BlockedDate {
            date,
            reason: reason.map(str::to_string),
        });
        Ok(Some(pending))
    }

    pub fn settle_block(
        &mut self,
        pending: Pending<AvailabilitySnapshot>,
        result: Result<BlockedDate, BackendError>,
    ) -> Result<BlockedDate, ViewError> {
        let (blocked, current) = self.settle(pending, result)?;
        if current {
            if let Some(data) = self.data.as_mut() {
                data.insert_blocked(blocked.clone());
            }
        }
        Ok(blocked)
    }

    pub async fn block_date<B: VendorBackend + ?Sized>(
        &mut self,
        backend: &B,
        date: NaiveDate,
        reason: Option<&str>,
    ) -> Result<(), ViewError> {
        let Some(pending) = self.begin_block(date, reason)? else {
            return Ok(());
        };
        let result = backend.block_date(&self.vendor_id, date, reason).await;
        self.settle_block(pending, result).map(|_| ())
    }

    pub fn begin_unblock(
        &mut self,
        date: NaiveDate,
    ) -> Result<Pending<AvailabilitySnapshot>, ViewError> {
        let existing = self
            .data_mut()?
            .blocked(date)
            .cloned()
            .ok_or_else(|| ViewError::NotFound(format!("blocked date {}", date)))?;

        let pending = self
            .sync
            .begin(date.to_string(), AvailabilitySnapshot::Date(date, Some(existing)))?;
        self.data_mut()?.remove_blocked(date);
        Ok(pending)
    }

    pub fn settle_unblock(
        &mut self,
        pending: Pending<AvailabilitySnapshot>,
        result: Result<(), BackendError>,
    ) -> Result<(), ViewError> {
        self.settle(pending, result).map(|_| ())
    }

    pub async fn unblock_date<B: VendorBackend + ?Sized>(
        &mut self,
        backend: &B,
        date: NaiveDate,
    ) -> Result<(), ViewError> {
        let pending = self.begin_unblock(date)?;
        let result = backend.unblock_date(&self.vendor_id, date).await;
        self.settle_unblock(pending, result)
    }

    // ===== Settings =====

    pub fn begin_save_settings(
        &mut self,
        settings: &AvailabilitySettings,
    ) -> Result<Pending<AvailabilitySnapshot>, ViewError> {
        settings.validate()?;
        let previous = self.data_mut()?.settings.clone();

        let pending = self
            .sync
            .begin(SETTINGS_ENTITY, AvailabilitySnapshot::Settings(previous))?;
        self.data_mut()?.settings = settings.clone();
        Ok(pending)
    }

    pub fn settle_save_settings(
        &mut self,
        pending: Pending<AvailabilitySnapshot>,
        result: Result<AvailabilitySettings, BackendError>,
    ) -> Result<AvailabilitySettings, ViewError> {
        let (saved, current) = self.settle(pending, result)?;
        if current {
            if let Some(data) = self.data.as_mut() {
                data.settings = saved.clone();
            }
        }
        Ok(saved)
    }

    pub async fn save_settings<B: VendorBackend + ?Sized>(
        &mut self,
        backend: &B,
        settings: AvailabilitySettings,
    ) -> Result<AvailabilitySettings, ViewError> {
        let pending = self.begin_save_settings(&settings)?;
        let result = backend
            .save_availability_settings(&self.vendor_id, &settings)
            .await;
        self.settle_save_settings(pending, result)
    }

    fn settle<T>(
        &mut self,
        pending: Pending<AvailabilitySnapshot>,
        result: Result<T, BackendError>,
    ) -> Result<(T, bool), ViewError> {
        let entity = pending.entity().to_string();
        let snapshot = self.sync.finish(pending);

        match result {
            Ok(value) => {
                invalidate_entity(&self.cache, EntityKind::Availability);
                Ok((value, snapshot.is_some()))
            }
            Err(e) => {
                warn!(entity = %entity, error = %e, "Availability write failed, rolling back");
                if let (Some(snapshot), Some(data)) = (snapshot, self.data.as_mut()) {
                    match snapshot {
                        AvailabilitySnapshot::Date(date, Some(previous)) => {
                            debug_assert_eq!(date, previous.date);
                            data.insert_blocked(previous);
                        }
                        AvailabilitySnapshot::Date(date, None) => {
                            data.remove_blocked(date);
                        }
                        AvailabilitySnapshot::Settings(previous) => data.settings = previous,
                    }
                }
                Err(e.into())
            }
        }
    }
}
