use tracing::info;

use super::CommandError;
use crate::cache::CacheManager;
use crate::cli::AvailabilityCommand;
use crate::data::VendorBackend;
use crate::output::{render_calendar, render_settings};
use crate::views::{AvailabilityView, ViewError};

pub async fn run<B: VendorBackend + ?Sized>(
    backend: &B,
    cache: CacheManager,
    vendor_id: &str,
    command: AvailabilityCommand,
) -> Result<String, CommandError> {
    let today = cache.clock().today();
    let mut view = AvailabilityView::new(cache, vendor_id);
    let source = view.load(backend).await?;

    match command {
        AvailabilityCommand::Show { days } => {
            let calendar = view.calendar(today, usize::from(days))?;
            let data = view.data().ok_or(ViewError::NotLoaded("availability"))?;
            Ok(render_calendar(&calendar, &data.settings, source))
        }

        AvailabilityCommand::Block { date, reason } => {
            let already_blocked = view.data().and_then(|d| d.blocked(date)).is_some();
            if already_blocked {
                return Ok(format!("{} is already blocked", date));
            }
            view.block_date(backend, date, reason.as_deref()).await?;
            info!(%date, "Blocked date");
            Ok(format!("Blocked {}", date))
        }

        AvailabilityCommand::Unblock { date } => {
            view.unblock_date(backend, date).await?;
            info!(%date, "Unblocked date");
            Ok(format!("Unblocked {}", date))
        }

        AvailabilityCommand::Settings {
            working_days,
            lead_days,
            max_per_day,
        } => {
            let current = view
                .data()
                .ok_or(ViewError::NotLoaded("availability"))?
                .settings
                .clone();
            if working_days.is_none() && lead_days.is_none() && max_per_day.is_none() {
                return Ok(render_settings(&current));
            }

            let mut settings = current;
            if let Some(days) = working_days {
                settings.working_days = days;
            }
            if let Some(days) = lead_days {
                settings.lead_time_days = days;
            }
            if let Some(max) = max_per_day {
                settings.max_bookings_per_day = max;
            }

            let saved = view.save_settings(backend, settings).await?;
            info!("Saved availability settings");
            Ok(format!("Saved settings\n{}", render_settings(&saved)))
        }
    }
}
