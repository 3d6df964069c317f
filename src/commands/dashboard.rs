use tracing::info;

use super::CommandError;
use crate::cache::CacheManager;
use crate::cli::RequestsCommand;
use crate::data::VendorBackend;
use crate::output::render_dashboard;
use crate::views::{DashboardView, ViewError};

pub async fn show<B: VendorBackend + ?Sized>(
    backend: &B,
    cache: CacheManager,
    vendor_id: &str,
) -> Result<String, CommandError> {
    let mut view = DashboardView::new(cache, vendor_id);
    let source = view.load(backend).await?;
    let summary = view.summary().ok_or(ViewError::NotLoaded("dashboard"))?;
    Ok(render_dashboard(&summary, source))
}

pub async fn run<B: VendorBackend + ?Sized>(
    backend: &B,
    cache: CacheManager,
    vendor_id: &str,
    command: RequestsCommand,
) -> Result<String, CommandError> {
    let (id, accept) = match command {
        RequestsCommand::Accept { id } => (id, true),
        RequestsCommand::Decline { id } => (id, false),
    };

    let mut view = DashboardView::new(cache, vendor_id);
    view.load(backend).await?;
    let booking = view.respond_to_request(backend, &id, accept).await?;
    info!(booking = %booking.id, status = booking.status.as_str(), "Responded to request");

    Ok(format!(
        "Booking {} for {} on {} is now {}",
        booking.id,
        booking.client_name,
        booking.event_date,
        booking.status.as_str()
    ))
}
