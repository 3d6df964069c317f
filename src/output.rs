//! Plain-text rendering of views
//!
//! Each function returns the full text for one screen so commands only have
//! to print it. Every screen ends with a line saying where the data came from.

use std::fmt::Write;

use chrono::Weekday;

use crate::data::{format_price, AvailabilitySettings, Booking, Package};
use crate::views::{CalendarDay, DashboardSummary, DayStatus, LoadSource};

/// Footer naming where a view's data came from
pub fn source_line(source: LoadSource) -> &'static str {
    match source {
        LoadSource::Cache => "(from cache)",
        LoadSource::Network => "(fetched from server)",
    }
}

fn booking_line(booking: &Booking) -> String {
    format!(
        "  {}  {:<24} {:>12}  [{}]",
        booking.event_date,
        booking.client_name,
        format_price(booking.total_cents),
        booking.id
    )
}

pub fn render_dashboard(summary: &DashboardSummary, source: LoadSource) -> String {
    let stats = &summary.stats;
    let mut out = String::new();

    let _ = writeln!(out, "Dashboard");
    let _ = writeln!(out, "  Pending requests:  {}", stats.pending_requests);
    let _ = writeln!(out, "  Upcoming bookings: {}", stats.upcoming_bookings);
    let _ = writeln!(
        out,
        "  Packages:          {} active / {} total",
        stats.active_packages, stats.total_packages
    );
    let _ = writeln!(
        out,
        "  Confirmed revenue: {}",
        format_price(stats.confirmed_revenue_cents)
    );

    let _ = writeln!(out);
    match &summary.next_booking {
        Some(next) => {
            let _ = writeln!(out, "Next booking");
            let _ = writeln!(out, "{}", booking_line(next));
        }
        None => {
            let _ = writeln!(out, "No upcoming bookings");
        }
    }

    let _ = writeln!(out);
    if summary.recent_requests.is_empty() {
        let _ = writeln!(out, "No booking requests waiting");
    } else {
        let _ = writeln!(out, "Recent requests");
        for request in &summary.recent_requests {
            let _ = writeln!(out, "{}", booking_line(request));
        }
    }

    let _ = write!(out, "{}", source_line(source));
    out
}

pub fn package_line(package: &Package) -> String {
    let hours = package
        .duration_hours
        .map(|h| format!("{}h", h))
        .unwrap_or_else(|| "-".to_string());
    let status = if package.is_active { "active" } else { "hidden" };
    format!(
        "  {:<12} {:<28} {:>12} {:>6}  {}",
        package.id,
        package.name,
        format_price(package.price_cents),
        hours,
        status
    )
}

pub fn render_packages(packages: &[&Package], source: LoadSource) -> String {
    let mut out = String::new();
    if packages.is_empty() {
        let _ = writeln!(out, "No packages yet");
    } else {
        let _ = writeln!(out, "Packages ({})", packages.len());
        for package in packages {
            let _ = writeln!(out, "{}", package_line(package));
            if let Some(ref description) = package.description {
                let _ = writeln!(out, "               {}", description);
            }
        }
    }
    let _ = write!(out, "{}", source_line(source));
    out
}

fn weekday_abbrev(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

pub fn render_settings(settings: &AvailabilitySettings) -> String {
    let days: Vec<&str> = settings
        .working_days
        .iter()
        .map(|d| weekday_abbrev(*d))
        .collect();
    let days = if days.is_empty() {
        "none".to_string()
    } else {
        days.join(", ")
    };
    format!(
        "Working days: {}\nLead time: {} day(s)\nMax bookings per day: {}",
        days, settings.lead_time_days, settings.max_bookings_per_day
    )
}

pub fn render_calendar(
    days: &[CalendarDay],
    settings: &AvailabilitySettings,
    source: LoadSource,
) -> String {
    use chrono::Datelike;

    let mut out = String::new();
    let _ = writeln!(out, "{}", render_settings(settings));
    let _ = writeln!(out);
    for day in days {
        let marker = match day.status {
            DayStatus::Available => " ",
            DayStatus::Blocked => "x",
            DayStatus::Past | DayStatus::NonWorking | DayStatus::InsideLeadTime => "-",
        };
        let _ = write!(
            out,
            "  {} {} {} {}",
            marker,
            weekday_abbrev(day.date.weekday()),
            day.date,
            day.status.as_str()
        );
        if let Some(ref reason) = day.reason {
            let _ = write!(out, " ({})", reason);
        }
        let _ = writeln!(out);
    }
    let _ = write!(out, "{}", source_line(source));
    out
}
