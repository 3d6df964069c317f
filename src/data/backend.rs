//! Backend abstraction for the marketplace's hosted database
//!
//! Views only ever talk to a [`VendorBackend`]; the HTTP implementation
//! lives in [`super::rest`] and an in-memory one in [`super::memory`].

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use super::{
    AvailabilitySettings, BlockedDate, Booking, BookingStatus, NewPackage, Package, PackageUpdate,
};

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors returned by backend calls
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Unauthorized - API key may be invalid or expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => BackendError::Unauthorized,
            403 => BackendError::AccessDenied(truncated),
            404 => BackendError::NotFound(truncated),
            409 => BackendError::Conflict(truncated),
            429 => BackendError::RateLimited,
            500..=599 => BackendError::ServerError(truncated),
            _ => BackendError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

/// CRUD operations the vendor views need from the marketplace backend
#[async_trait]
pub trait VendorBackend: Send + Sync {
    async fn list_packages(&self, vendor_id: &str) -> Result<Vec<Package>, BackendError>;

    async fn create_package(
        &self,
        vendor_id: &str,
        package: &NewPackage,
    ) -> Result<Package, BackendError>;

    async fn update_package(
        &self,
        package_id: &str,
        update: &PackageUpdate,
    ) -> Result<Package, BackendError>;

    async fn delete_package(&self, package_id: &str) -> Result<(), BackendError>;

    async fn list_bookings(&self, vendor_id: &str) -> Result<Vec<Booking>, BackendError>;

    async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<Booking, BackendError>;

    async fn list_blocked_dates(&self, vendor_id: &str) -> Result<Vec<BlockedDate>, BackendError>;

    async fn block_date(
        &self,
        vendor_id: &str,
        date: NaiveDate,
        reason: Option<&str>,
    ) -> Result<BlockedDate, BackendError>;

    async fn unblock_date(&self, vendor_id: &str, date: NaiveDate) -> Result<(), BackendError>;

    /// Returns `None` when the vendor has never saved settings
    async fn get_availability_settings(
        &self,
        vendor_id: &str,
    ) -> Result<Option<AvailabilitySettings>, BackendError>;

    async fn save_availability_settings(
        &self,
        vendor_id: &str,
        settings: &AvailabilitySettings,
    ) -> Result<AvailabilitySettings, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            BackendError::from_status(StatusCode::UNAUTHORIZED, ""),
            BackendError::Unauthorized
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::FORBIDDEN, "rls"),
            BackendError::AccessDenied(body) if body == "rls"
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::CONFLICT, "dup"),
            BackendError::Conflict(_)
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::TOO_MANY_REQUESTS, ""),
            BackendError::RateLimited
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::BAD_GATEWAY, "down"),
            BackendError::ServerError(_)
        ));
        assert!(matches!(
            BackendError::from_status(StatusCode::IM_A_TEAPOT, "tea"),
            BackendError::InvalidResponse(msg) if msg.contains("418")
        ));
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "é".repeat(400);
        let err = BackendError::from_status(StatusCode::NOT_FOUND, &body);
        let BackendError::NotFound(msg) = err else {
            panic!("expected NotFound");
        };
        assert!(msg.contains("truncated, 800 total bytes"));
    }
}
