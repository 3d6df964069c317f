//! Command-line interface parsing for vendordash
//!
//! This module handles parsing of CLI arguments using clap. Connection
//! settings can come from flags or from `VENDORDASH_*` environment
//! variables; subcommands select the view to show or the change to make.

use std::path::PathBuf;

use chrono::{NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use thiserror::Error;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// Prices are dollars with at most two decimal places
    #[error("Invalid price: '{0}'. Use dollars, e.g. 1250 or 99.50")]
    InvalidPrice(String),

    /// Dates are ISO calendar dates
    #[error("Invalid date: '{0}'. Use YYYY-MM-DD")]
    InvalidDate(String),

    /// Weekdays are English day names or their abbreviations
    #[error("Invalid weekday: '{0}'. Use mon, tue, wed, thu, fri, sat, sun")]
    InvalidWeekday(String),
}

/// vendordash - manage your marketplace packages, availability and bookings
#[derive(Parser, Debug)]
#[command(name = "vendordash")]
#[command(about = "Manage marketplace packages, availability and booking requests")]
#[command(version)]
pub struct Cli {
    /// Base URL of the marketplace backend
    #[arg(long, global = true, env = "VENDORDASH_API_URL")]
    pub api_url: Option<String>,

    /// API key for the marketplace backend
    #[arg(long, global = true, env = "VENDORDASH_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Your vendor id
    #[arg(long, global = true, env = "VENDORDASH_VENDOR_ID")]
    pub vendor_id: Option<String>,

    /// Directory for cached data (defaults to the platform cache dir)
    #[arg(long, global = true, env = "VENDORDASH_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Prefix for cache entries
    #[arg(long, global = true, env = "VENDORDASH_NAMESPACE")]
    pub namespace: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show booking requests, upcoming bookings and package counts
    Dashboard,

    /// Respond to booking requests
    #[command(subcommand)]
    Requests(RequestsCommand),

    /// List and edit your packages
    #[command(subcommand)]
    Packages(PackagesCommand),

    /// Show and edit your availability calendar
    #[command(subcommand)]
    Availability(AvailabilityCommand),

    /// Manage locally cached data
    #[command(subcommand)]
    Cache(CacheCommand),
}

impl Command {
    /// Whether the command talks to the backend
    pub fn needs_backend(&self) -> bool {
        !matches!(self, Command::Cache(_))
    }
}

#[derive(Subcommand, Debug)]
pub enum RequestsCommand {
    /// Accept a pending booking request
    Accept { id: String },
    /// Decline a pending booking request
    Decline { id: String },
}

#[derive(Subcommand, Debug)]
pub enum PackagesCommand {
    /// List packages
    List,

    /// Create a package
    Add {
        #[arg(long)]
        name: String,

        /// Price in dollars
        #[arg(long, value_parser = parse_price)]
        price: i64,

        #[arg(long)]
        description: Option<String>,

        /// Duration in hours
        #[arg(long)]
        hours: Option<f64>,

        /// Create the package hidden from clients
        #[arg(long)]
        inactive: bool,
    },

    /// Change fields of a package
    Edit {
        id: String,

        #[arg(long)]
        name: Option<String>,

        /// Price in dollars
        #[arg(long, value_parser = parse_price)]
        price: Option<i64>,

        #[arg(long)]
        description: Option<String>,

        /// Duration in hours
        #[arg(long)]
        hours: Option<f64>,

        /// Show (true) or hide (false) the package from clients
        #[arg(long)]
        active: Option<bool>,
    },

    /// Delete a package
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum AvailabilityCommand {
    /// Show the calendar starting today
    Show {
        /// Number of days to show (1-366)
        #[arg(
            long,
            default_value_t = 14,
            value_parser = clap::value_parser!(u16).range(1..=366)
        )]
        days: u16,
    },

    /// Block a date
    Block {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,

        #[arg(long)]
        reason: Option<String>,
    },

    /// Unblock a date
    Unblock {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },

    /// Change weekly availability rules
    Settings {
        /// Comma-separated working days, e.g. mon,tue,sat
        #[arg(long, value_delimiter = ',', value_parser = parse_weekday)]
        working_days: Option<Vec<Weekday>>,

        /// Minimum days of notice for a booking
        #[arg(long)]
        lead_days: Option<u32>,

        /// Bookings you can take on one date
        #[arg(long)]
        max_per_day: Option<u32>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Remove cached entries, optionally only those whose name contains PATTERN
    Clear { pattern: Option<String> },
}

/// Parses a dollar amount such as `1250`, `$99.5` or `99.50` into cents
pub fn parse_price(s: &str) -> Result<i64, CliError> {
    let invalid = || CliError::InvalidPrice(s.to_string());
    let trimmed = s.trim();
    let amount = trimmed.strip_prefix('$').unwrap_or(trimmed);

    let (dollars, cents) = match amount.split_once('.') {
        Some((dollars, fraction)) => {
            if fraction.is_empty()
                || fraction.len() > 2
                || !fraction.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(invalid());
            }
            let cents: i64 = fraction.parse().map_err(|_| invalid())?;
            let cents = if fraction.len() == 1 { cents * 10 } else { cents };
            (dollars, cents)
        }
        None => (amount, 0),
    };

    if dollars.is_empty() || !dollars.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let dollars: i64 = dollars.parse().map_err(|_| invalid())?;
    dollars
        .checked_mul(100)
        .and_then(|d| d.checked_add(cents))
        .ok_or_else(invalid)
}

/// Parses an ISO `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDate(s.to_string()))
}

/// Parses a weekday name such as `mon` or `Saturday`
pub fn parse_weekday(s: &str) -> Result<Weekday, CliError> {
    s.trim()
        .parse::<Weekday>()
        .map_err(|_| CliError::InvalidWeekday(s.to_string()))
}
