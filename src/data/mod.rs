//! Core data models for the vendor dashboard
//!
//! This module contains the records exchanged with the marketplace backend
//! (packages, bookings, blocked dates, availability settings) and the
//! backend client abstraction the views talk to.

pub mod backend;
pub mod memory;
pub mod rest;

pub use backend::{BackendError, VendorBackend};
pub use memory::MemoryBackend;
pub use rest::RestClient;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejections for user input that would never be accepted by the backend
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Package names must contain something besides whitespace
    #[error("Package name cannot be empty")]
    EmptyName,

    /// Prices are stored in cents and cannot go below zero
    #[error("Price cannot be negative (got {0} cents)")]
    NegativePrice(i64),

    /// Durations must be a positive number of hours
    #[error("Duration must be a positive number of hours")]
    InvalidDuration,

    /// A vendor must accept at least one booking on a working day
    #[error("Max bookings per day must be at least 1")]
    ZeroDailyCapacity,

    /// Dates before today cannot be blocked
    #[error("Cannot block {0}: date is in the past")]
    PastDate(NaiveDate),

    /// An update must change at least one field
    #[error("No changes given")]
    EmptyUpdate,
}

/// A service package offered by a vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Backend-assigned identifier
    pub id: String,
    /// Owning vendor
    pub vendor_id: String,
    /// Display name
    pub name: String,
    /// Optional longer description
    #[serde(default)]
    pub description: Option<String>,
    /// Price in cents
    pub price_cents: i64,
    /// Length of the service in hours, if fixed
    #[serde(default)]
    pub duration_hours: Option<f64>,
    /// Whether clients can currently book this package
    pub is_active: bool,
    /// When the package was created
    pub created_at: DateTime<Utc>,
}

impl Package {
    /// Applies the fields present in `update` to this package
    pub fn apply(&mut self, update: &PackageUpdate) {
        if let Some(ref name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(ref description) = update.description {
            self.description = Some(description.clone());
        }
        if let Some(price) = update.price_cents {
            self.price_cents = price;
        }
        if let Some(hours) = update.duration_hours {
            self.duration_hours = Some(hours);
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
    }
}

/// Fields for creating a package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPackage {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f64>,
    pub is_active: bool,
}

impl NewPackage {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name(&self.name)?;
        validate_price(self.price_cents)?;
        validate_duration(self.duration_hours)
    }
}

/// Partial update for a package; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl PackageUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyUpdate);
        }
        if let Some(ref name) = self.name {
            validate_name(name)?;
        }
        if let Some(price) = self.price_cents {
            validate_price(price)?;
        }
        validate_duration(self.duration_hours)
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(())
}

fn validate_price(price_cents: i64) -> Result<(), ValidationError> {
    if price_cents < 0 {
        return Err(ValidationError::NegativePrice(price_cents));
    }
    Ok(())
}

fn validate_duration(hours: Option<f64>) -> Result<(), ValidationError> {
    match hours {
        Some(h) if !(h.is_finite() && h > 0.0) => Err(ValidationError::InvalidDuration),
        _ => Ok(()),
    }
}

/// Lifecycle of a booking request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Waiting for the vendor to respond
    Pending,
    /// Accepted by the vendor
    Confirmed,
    /// Rejected by the vendor
    Declined,
    /// Withdrawn by the client
    Cancelled,
    /// Event has taken place
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Declined => "declined",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

/// A client's booking of a vendor for an event date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub vendor_id: String,
    #[serde(default)]
    pub package_id: Option<String>,
    pub client_name: String,
    pub event_date: NaiveDate,
    pub status: BookingStatus,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// A date the vendor has marked as unavailable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedDate {
    pub date: NaiveDate,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Weekly availability rules for a vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySettings {
    /// Days of the week the vendor works
    pub working_days: Vec<Weekday>,
    /// Minimum notice, in days, before an event date can be booked
    pub lead_time_days: u32,
    /// Bookings the vendor can take on one date
    pub max_bookings_per_day: u32,
}

impl Default for AvailabilitySettings {
    fn default() -> Self {
        Self {
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
                Weekday::Sat,
            ],
            lead_time_days: 2,
            max_bookings_per_day: 1,
        }
    }
}

impl AvailabilitySettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_bookings_per_day == 0 {
            return Err(ValidationError::ZeroDailyCapacity);
        }
        Ok(())
    }

    pub fn works_on(&self, day: Weekday) -> bool {
        self.working_days.contains(&day)
    }
}

/// Formats a price in cents as dollars, e.g. `$1,250.00`
pub fn format_price(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}${}.{:02}", sign, grouped, cents % 100)
}
