use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::actor_framework::{pump, CollectionActor, CollectionClient};
use crate::clients::{DesignClient, OrderClient};
use crate::domain::{seed_catalog, Design, Order};
use crate::error::FrameworkError;
use crate::gateway::{Backend, PersistenceGateway, Subscription};

/// Shown once when the initial load could not reach the store.
pub const OFFLINE_NOTICE: &str = "Store unreachable, showing the built-in catalog";

/// The running system: one actor per collection, the clients over them, and
/// the feed pumps of a pushing backend.
pub struct StoreSystem {
    pub design_client: DesignClient,
    pub order_client: OrderClient,
    gateway: Arc<dyn PersistenceGateway>,
    designs: CollectionClient<Design>,
    orders: CollectionClient<Order>,
    load_notice: Option<String>,
    handles: Vec<JoinHandle<()>>,
    pumps: Vec<JoinHandle<()>>,
}

impl StoreSystem {
    pub async fn start(
        gateway: Arc<dyn PersistenceGateway>,
        channel_buffer: usize,
    ) -> Result<Self, FrameworkError> {
        info!(backend = %gateway.backend(), "Starting store system");

        let (design_actor, designs) = CollectionActor::<Design>::new(channel_buffer);
        let (order_actor, orders) = CollectionActor::<Order>::new(channel_buffer);
        let handles = vec![tokio::spawn(design_actor.run()), tokio::spawn(order_actor.run())];

        // Subscribe before the first read so nothing written in between is missed.
        let (design_feed, order_feed) = if gateway.pushes_changes() {
            (
                subscribe(gateway.subscribe_to_designs().await),
                subscribe(gateway.subscribe_to_orders().await),
            )
        } else {
            (None, None)
        };

        let mut load_notice = None;
        let initial_designs = match gateway.try_fetch_designs().await {
            Ok(designs) => designs,
            Err(e) => {
                warn!(error = %e, "{OFFLINE_NOTICE}");
                load_notice = Some(OFFLINE_NOTICE.to_string());
                seed_catalog()
            }
        };
        let initial_orders = match gateway.try_fetch_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                if load_notice.is_none() {
                    warn!(error = %e, "{OFFLINE_NOTICE}");
                    load_notice = Some(OFFLINE_NOTICE.to_string());
                }
                Vec::new()
            }
        };
        info!(
            designs = initial_designs.len(),
            orders = initial_orders.len(),
            "Initial load complete"
        );
        designs.replace(initial_designs).await?;
        orders.replace(initial_orders).await?;

        let mut pumps = Vec::new();
        if let Some(feed) = design_feed {
            pumps.push(tokio::spawn(pump(feed, designs.clone())));
        }
        if let Some(feed) = order_feed {
            pumps.push(tokio::spawn(pump(feed, orders.clone())));
        }

        let design_client = DesignClient::new(designs.clone(), gateway.clone());
        let order_client = OrderClient::new(orders.clone(), design_client.clone(), gateway.clone());

        Ok(Self {
            design_client,
            order_client,
            gateway,
            designs,
            orders,
            load_notice,
            handles,
            pumps,
        })
    }

    pub fn backend(&self) -> Backend {
        self.gateway.backend()
    }

    /// The one-time connectivity notice raised by the initial load, if any.
    pub fn load_notice(&self) -> Option<&str> {
        self.load_notice.as_deref()
    }

    /// Whether change feeds are attached.
    pub fn is_live(&self) -> bool {
        !self.pumps.is_empty()
    }

    pub async fn shutdown(self) -> Result<(), FrameworkError> {
        info!("Shutting down store system...");

        for pump in &self.pumps {
            pump.abort();
        }
        for pump in self.pumps {
            // cancellation is the expected outcome
            let _ = pump.await;
        }

        self.designs.shutdown().await?;
        self.orders.shutdown().await?;

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Actor task failed: {:?}", e);
                return Err(FrameworkError::TaskFailed(e.to_string()));
            }
        }

        info!("Store system shutdown complete.");
        Ok(())
    }
}

fn subscribe(result: Result<Subscription, crate::error::GatewayError>) -> Option<Subscription> {
    match result {
        Ok(subscription) if subscription.is_live() => Some(subscription),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "Change feed unavailable, running without live updates");
            None
        }
    }
}
