use tracing::info;

use super::CommandError;
use crate::cache::CacheManager;
use crate::cli::PackagesCommand;
use crate::data::{NewPackage, PackageUpdate, VendorBackend};
use crate::output::{package_line, render_packages};
use crate::views::PackagesView;

pub async fn run<B: VendorBackend + ?Sized>(
    backend: &B,
    cache: CacheManager,
    vendor_id: &str,
    command: PackagesCommand,
) -> Result<String, CommandError> {
    let mut view = PackagesView::new(cache, vendor_id);
    let source = view.load(backend).await?;

    match command {
        PackagesCommand::List => Ok(render_packages(&view.packages(), source)),

        PackagesCommand::Add {
            name,
            price,
            description,
            hours,
            inactive,
        } => {
            let new = NewPackage {
                name,
                description,
                price_cents: price,
                duration_hours: hours,
                is_active: !inactive,
            };
            let created = view.add_package(backend, new).await?;
            info!(package = %created.id, "Created package");
            Ok(format!("Created package\n{}", package_line(&created)))
        }

        PackagesCommand::Edit {
            id,
            name,
            price,
            description,
            hours,
            active,
        } => {
            let update = PackageUpdate {
                name,
                description,
                price_cents: price,
                duration_hours: hours,
                is_active: active,
            };
            let updated = view.update_package(backend, &id, update).await?;
            info!(package = %updated.id, "Updated package");
            Ok(format!("Updated package\n{}", package_line(&updated)))
        }

        PackagesCommand::Delete { id } => {
            let name = view.get(&id).map(|p| p.name.clone());
            view.delete_package(backend, &id).await?;
            info!(package = %id, "Deleted package");
            Ok(match name {
                Some(name) => format!("Deleted package {} ({})", id, name),
                None => format!("Deleted package {}", id),
            })
        }
    }
}
