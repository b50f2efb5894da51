use combo_stock::app_system::{setup_tracing, StoreConfig, StoreSystem};
use combo_stock::gateway::{self, FileKeyValueStore};
use tracing::{info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup tracing once for the entire application
    setup_tracing();

    let config = StoreConfig::from_env()?;
    if let Some(remote) = &config.remote {
        warn!(url = %remote.url, "No network client bundled, using the local store instead");
    }

    info!(data_dir = %config.data_dir.display(), "Starting combo stock");
    let gateway = gateway::select(None, FileKeyValueStore::new(&config.data_dir));
    let system = StoreSystem::start(gateway, config.channel_buffer).await?;

    if let Some(notice) = system.load_notice() {
        warn!("{notice}");
    }

    let span = tracing::info_span!("catalog_report", backend = %system.backend());
    async {
        let summary = system.design_client.summary().await?;
        info!(
            designs = summary.designs,
            total_units = summary.total_units,
            low_stock_cells = summary.low_stock_cells,
            "Catalog loaded"
        );

        for order in system.order_client.pending_orders().await? {
            let design = system.design_client.design_label(&order.design_id).await?;
            info!(
                order_id = %order.id,
                %design,
                combo = order.combo_type.label(),
                customer = %order.customer_name,
                "Pending order"
            );
        }
        Ok::<_, Box<dyn std::error::Error>>(())
    }
    .instrument(span)
    .await?;

    system.shutdown().await?;

    info!("Application completed successfully");
    Ok(())
}
