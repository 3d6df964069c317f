//! REST client for the marketplace's hosted database
//!
//! The backend exposes its tables through a PostgREST-style API at
//! `{base}/rest/v1/{table}`. Rows are filtered with `column=eq.value` query
//! parameters and writes ask for the affected rows back with
//! `Prefer: return=representation`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::backend::{BackendError, VendorBackend};
use super::{
    AvailabilitySettings, BlockedDate, Booking, BookingStatus, NewPackage, Package, PackageUpdate,
};

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

const PACKAGES_TABLE: &str = "packages";
const BOOKINGS_TABLE: &str = "bookings";
const BLOCKED_DATES_TABLE: &str = "blocked_dates";
const SETTINGS_TABLE: &str = "availability_settings";

/// Ask the backend to return the written rows
const PREFER_RETURN: &str = "return=representation";

/// Upsert on the table's unique key, returning the written row
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=representation";

#[derive(Serialize)]
struct VendorRow<'a, T: Serialize> {
    vendor_id: &'a str,
    #[serde(flatten)]
    fields: &'a T,
}

#[derive(Serialize)]
struct BlockedDateRow<'a> {
    vendor_id: &'a str,
    date: NaiveDate,
    reason: Option<&'a str>,
}

#[derive(Serialize)]
struct StatusPatch {
    status: BookingStatus,
}

/// Client for the marketplace REST API
///
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl RestClient {
    /// Creates a client for `base_url` authenticated with `api_key`
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    /// Creates a client with a custom HTTP client
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Builds `{base}/rest/v1/{table}?k=v&...` with URL-encoded values
    fn table_url(&self, table: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}/rest/v1/{}", self.base_url, table);
        for (i, (key, value)) in query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(key);
            url.push('=');
            url.push_str(&urlencoding::encode(value));
        }
        url
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Sends the request and decodes a JSON array of rows
    async fn send_rows<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Vec<T>, BackendError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::from_status(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Takes the single row a write is expected to return
    fn first_row<T>(rows: Vec<T>, what: &str) -> Result<T, BackendError> {
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(what.to_string()))
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl VendorBackend for RestClient {
    async fn list_packages(&self, vendor_id: &str) -> Result<Vec<Package>, BackendError> {
        let url = self.table_url(
            PACKAGES_TABLE,
            &[
                ("vendor_id", eq(vendor_id)),
                ("order", "created_at.asc".to_string()),
            ],
        );
        debug!(url = %url, "Fetching packages");
        self.send_rows(self.request(Method::GET, &url)).await
    }

    async fn create_package(
        &self,
        vendor_id: &str,
        package: &NewPackage,
    ) -> Result<Package, BackendError> {
        let url = self.table_url(PACKAGES_TABLE, &[]);
        let body = VendorRow {
            vendor_id,
            fields: package,
        };
        let rows = self
            .send_rows(
                self.request(Method::POST, &url)
                    .header("Prefer", PREFER_RETURN)
                    .json(&body),
            )
            .await?;
        Self::first_row(rows, "created package")
    }

    async fn update_package(
        &self,
        package_id: &str,
        update: &PackageUpdate,
    ) -> Result<Package, BackendError> {
        let url = self.table_url(PACKAGES_TABLE, &[("id", eq(package_id))]);
        let rows = self
            .send_rows(
                self.request(Method::PATCH, &url)
                    .header("Prefer", PREFER_RETURN)
                    .json(update),
            )
            .await?;
        Self::first_row(rows, &format!("package {}", package_id))
    }

    async fn delete_package(&self, package_id: &str) -> Result<(), BackendError> {
        let url = self.table_url(PACKAGES_TABLE, &[("id", eq(package_id))]);
        let rows: Vec<Package> = self
            .send_rows(self.request(Method::DELETE, &url).header("Prefer", PREFER_RETURN))
            .await?;
        Self::first_row(rows, &format!("package {}", package_id)).map(|_| ())
    }

    async fn list_bookings(&self, vendor_id: &str) -> Result<Vec<Booking>, BackendError> {
        let url = self.table_url(
            BOOKINGS_TABLE,
            &[
                ("vendor_id", eq(vendor_id)),
                ("order", "event_date.asc".to_string()),
            ],
        );
        debug!(url = %url, "Fetching bookings");
        self.send_rows(self.request(Method::GET, &url)).await
    }

    async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<Booking, BackendError> {
        let url = self.table_url(BOOKINGS_TABLE, &[("id", eq(booking_id))]);
        let rows = self
            .send_rows(
                self.request(Method::PATCH, &url)
                    .header("Prefer", PREFER_RETURN)
                    .json(&StatusPatch { status }),
            )
            .await?;
        Self::first_row(rows, &format!("booking {}", booking_id))
    }

    async fn list_blocked_dates(&self, vendor_id: &str) -> Result<Vec<BlockedDate>, BackendError> {
        let url = self.table_url(
            BLOCKED_DATES_TABLE,
            &[
                ("vendor_id", eq(vendor_id)),
                ("order", "date.asc".to_string()),
            ],
        );
        debug!(url = %url, "Fetching blocked dates");
        self.send_rows(self.request(Method::GET, &url)).await
    }

    async fn block_date(
        &self,
        vendor_id: &str,
        date: NaiveDate,
        reason: Option<&str>,
    ) -> Result<BlockedDate, BackendError> {
        let url = self.table_url(BLOCKED_DATES_TABLE, &[]);
        let body = BlockedDateRow {
            vendor_id,
            date,
            reason,
        };
        let rows = self
            .send_rows(
                self.request(Method::POST, &url)
                    .header("Prefer", PREFER_RETURN)
                    .json(&body),
            )
            .await?;
        Self::first_row(rows, "blocked date")
    }

    async fn unblock_date(&self, vendor_id: &str, date: NaiveDate) -> Result<(), BackendError> {
        let url = self.table_url(
            BLOCKED_DATES_TABLE,
            &[("vendor_id", eq(vendor_id)), ("date", eq(date))],
        );
        let _: Vec<BlockedDate> = self.send_rows(self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    async fn get_availability_settings(
        &self,
        vendor_id: &str,
    ) -> Result<Option<AvailabilitySettings>, BackendError> {
        let url = self.table_url(
            SETTINGS_TABLE,
            &[("vendor_id", eq(vendor_id)), ("limit", "1".to_string())],
        );
        let rows: Vec<AvailabilitySettings> =
            self.send_rows(self.request(Method::GET, &url)).await?;
        Ok(rows.into_iter().next())
    }

    async fn save_availability_settings(
        &self,
        vendor_id: &str,
        settings: &AvailabilitySettings,
    ) -> Result<AvailabilitySettings, BackendError> {
        let url = self.table_url(SETTINGS_TABLE, &[("on_conflict", "vendor_id".to_string())]);
        let body = VendorRow {
            vendor_id,
            fields: settings,
        };
        let rows = self
            .send_rows(
                self.request(Method::POST, &url)
                    .header("Prefer", PREFER_UPSERT)
                    .json(&body),
            )
            .await?;
        Self::first_row(rows, "availability settings")
    }
}
