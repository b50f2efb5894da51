use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::actor_framework::CollectionClient;
use crate::clients::DesignClient;
use crate::domain::{
    combo_members, is_valid_choice, member_to_category, Member, Order, OrderStatus, OrderSubmission,
    SizeChoice, DEFAULT_COUNTRY_CODE,
};
use crate::error::{DesignError, OrderError};
use crate::gateway::PersistenceGateway;
use crate::ledger::StockChange;

/// Result of accepting an order.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptOutcome {
    pub order: Order,
    /// One entry per member whose stock was taken, in member order.
    pub decrements: Vec<StockChange>,
    /// Members whose size could not be taken from the catalog.
    pub skipped: Vec<Member>,
}

/// Order lifecycle: submission, acceptance and rejection.
///
/// Orders leave `pending` at most once. Acceptance takes one unit per chosen
/// size from the design's stock before the status is written. Accept and
/// reject hold a lock shared by all clones from the pending check until the
/// status is written, so concurrent calls on one order take stock once.
#[derive(Clone)]
pub struct OrderClient {
    collection: CollectionClient<Order>,
    designs: DesignClient,
    gateway: Arc<dyn PersistenceGateway>,
    transitions: Arc<Mutex<()>>,
}

impl OrderClient {
    pub fn new(
        collection: CollectionClient<Order>,
        designs: DesignClient,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Self {
        Self {
            collection,
            designs,
            gateway,
            transitions: Arc::new(Mutex::new(())),
        }
    }

    async fn require_pending(&self, id: &str) -> Result<Order, OrderError> {
        let order = self
            .collection
            .get(id)
            .await?
            .ok_or_else(|| OrderError::NotFound(id.to_string()))?;
        if order.status.is_terminal() {
            warn!(order_id = %id, status = %order.status, "Order already processed");
            return Err(OrderError::AlreadyProcessed {
                id: order.id,
                status: order.status,
            });
        }
        Ok(order)
    }

    /// Brings the collection up to date after an order write. Backends that
    /// push changes get the record applied directly; the others are re-read.
    async fn mirror(&self, order: Order) -> Result<(), OrderError> {
        if self.gateway.pushes_changes() {
            self.collection.upsert(order).await?;
        } else {
            self.collection.replace(self.gateway.fetch_orders().await).await?;
        }
        Ok(())
    }

    async fn transition(&self, mut order: Order, status: OrderStatus) -> Result<Order, OrderError> {
        if let Err(e) = self.gateway.update_order_status(&order.id, status).await {
            error!(order_id = %order.id, %status, error = %e, "Status write failed");
            return Err(e.into());
        }
        order.status = status;
        self.mirror(order.clone()).await?;
        info!(order_id = %order.id, %status, "Order status changed");
        Ok(order)
    }

    /// Validates and records a customer submission as a new pending order.
    #[instrument(skip(self, submission), fields(design_id = %submission.design_id, combo = %submission.combo_type))]
    pub async fn submit(&self, submission: OrderSubmission) -> Result<Order, OrderError> {
        debug!("Sending request");
        for (field, value) in [
            ("name", &submission.customer_name),
            ("phone", &submission.customer_phone),
            ("address", &submission.customer_address),
        ] {
            if value.trim().is_empty() {
                return Err(OrderError::ValidationError(format!("Customer {field} is required")));
            }
        }

        if self.designs.get_design(submission.design_id.clone()).await?.is_none() {
            return Err(DesignError::NotFound(submission.design_id).into());
        }

        let members = combo_members(submission.combo_type);
        let mut selected_sizes = BTreeMap::new();
        for member in members {
            let choice = submission
                .selected_sizes
                .get(member)
                .copied()
                .unwrap_or(SizeChoice::NotApplicable);
            if !is_valid_choice(*member, choice) {
                return Err(OrderError::ValidationError(format!(
                    "Size {choice} is not available for {}",
                    member.label()
                )));
            }
            selected_sizes.insert(*member, choice);
        }
        let dropped = submission
            .selected_sizes
            .keys()
            .filter(|member| !members.contains(*member))
            .count();
        if dropped > 0 {
            debug!(dropped, "Ignoring sizes for members outside the combo");
        }

        let notes = submission
            .notes
            .map(|notes| {
                notes
                    .into_iter()
                    .filter(|(member, note)| members.contains(member) && !note.trim().is_empty())
                    .collect::<BTreeMap<_, _>>()
            })
            .filter(|notes| !notes.is_empty());

        let country_code = submission.customer_country_code.trim();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            design_id: submission.design_id,
            combo_type: submission.combo_type,
            selected_sizes,
            customer_name: submission.customer_name.trim().to_string(),
            customer_phone: submission.customer_phone.trim().to_string(),
            customer_country_code: if country_code.is_empty() {
                DEFAULT_COUNTRY_CODE.to_string()
            } else {
                country_code.to_string()
            },
            customer_address: submission.customer_address.trim().to_string(),
            customer_email: submission
                .customer_email
                .map(|email| email.trim().to_string())
                .filter(|email| !email.is_empty()),
            notes,
            status: OrderStatus::Pending,
            created_at: Utc::now().timestamp_millis(),
        };

        if let Err(e) = self.gateway.upsert_order(&order).await {
            error!(order_id = %order.id, error = %e, "Order write failed");
            return Err(e.into());
        }
        self.mirror(order.clone()).await?;
        info!(order_id = %order.id, "Order submitted");
        Ok(order)
    }

    /// Takes stock for every chosen size, then marks the order accepted.
    ///
    /// Members whose design is gone are skipped. A failed stock write stops
    /// the loop and leaves the order pending; cells already written stay
    /// written.
    #[instrument(skip(self))]
    pub async fn accept(&self, order_id: &str) -> Result<AcceptOutcome, OrderError> {
        debug!("Sending request");
        let _transition = self.transitions.lock().await;
        let order = self.require_pending(order_id).await?;

        let mut decrements = Vec::new();
        let mut skipped = Vec::new();
        for (member, choice) in order.chosen_sizes() {
            let Some(size) = choice.size() else {
                continue;
            };
            let category = member_to_category(member);
            // the design is re-read each time; feed events may land between steps
            match self.designs.decrement_stock(&order.design_id, category, size, 1).await {
                Ok(Some(change)) => decrements.push(change),
                Ok(None) => {
                    warn!(%member, design_id = %order.design_id, "Design missing, skipping member");
                    skipped.push(member);
                }
                Err(DesignError::Ledger(e)) => {
                    warn!(%member, error = %e, "Size not stocked for member, skipping");
                    skipped.push(member);
                }
                Err(e) => {
                    error!(
                        %member,
                        applied = decrements.len(),
                        error = %e,
                        "Stock update failed, order left pending"
                    );
                    return Err(e.into());
                }
            }
        }

        let order = self.transition(order, OrderStatus::Accepted).await?;
        Ok(AcceptOutcome {
            order,
            decrements,
            skipped,
        })
    }

    /// Marks a pending order rejected. Stock is not touched.
    #[instrument(skip(self))]
    pub async fn reject(&self, order_id: &str) -> Result<Order, OrderError> {
        debug!("Sending request");
        let _transition = self.transitions.lock().await;
        let order = self.require_pending(order_id).await?;
        self.transition(order, OrderStatus::Rejected).await
    }

    #[instrument(skip(self))]
    pub async fn pending_orders(&self) -> Result<Vec<Order>, OrderError> {
        let mut orders = self.collection.snapshot().await?;
        orders.retain(Order::is_pending);
        Ok(orders)
    }

    /// Replaces the collection with a fresh gateway read.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> Result<usize, OrderError> {
        let orders = self.gateway.fetch_orders().await;
        let count = orders.len();
        self.collection.replace(orders).await?;
        info!(count, "Orders reloaded");
        Ok(count)
    }
}

impl_collection_reads!(OrderClient, Order, OrderError, order);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor_framework::CollectionActor;
    use crate::domain::{AdultSize, ComboType, KidsSize};
    use crate::gateway::{LocalStore, MemoryKeyValueStore};
    use assert_matches::assert_matches;

    async fn clients() -> (OrderClient, DesignClient) {
        let gateway: Arc<dyn PersistenceGateway> = Arc::new(LocalStore::new(MemoryKeyValueStore::new()));
        let (design_actor, design_collection) = CollectionActor::new(16);
        let (order_actor, order_collection) = CollectionActor::new(16);
        tokio::spawn(design_actor.run());
        tokio::spawn(order_actor.run());
        let designs = DesignClient::new(design_collection, gateway.clone());
        designs.reload().await.unwrap();
        (OrderClient::new(order_collection, designs.clone(), gateway), designs)
    }

    fn submission() -> OrderSubmission {
        OrderSubmission::new("1", ComboType::FatherSon).customer(" Ravi ", "9876543210", "MG Road")
    }

    #[tokio::test]
    async fn submission_is_normalized_to_combo_members() {
        let (orders, _) = clients().await;
        let order = orders
            .submit(
                submission()
                    .size(Member::Father, AdultSize::Xxl)
                    .size(Member::Daughter, KidsSize::Age2To3),
            )
            .await
            .unwrap();

        assert_eq!(
            order.selected_sizes,
            BTreeMap::from([
                (Member::Father, SizeChoice::from(AdultSize::Xxl)),
                (Member::Son, SizeChoice::NotApplicable),
            ])
        );
        assert_eq!(order.customer_name, "Ravi");
        assert_eq!(order.customer_country_code, DEFAULT_COUNTRY_CODE);
        assert!(order.is_pending());
        assert_eq!(orders.pending_orders().await.unwrap(), vec![order]);
    }

    #[tokio::test]
    async fn submission_validation() {
        let (orders, _) = clients().await;
        let no_phone = OrderSubmission::new("1", ComboType::Couple).customer("Asha", " ", "Lake Road");
        assert_matches!(orders.submit(no_phone).await, Err(OrderError::ValidationError(_)));

        let kids_size_for_father = submission().size(Member::Father, KidsSize::Age4To5);
        assert_matches!(orders.submit(kids_size_for_father).await, Err(OrderError::ValidationError(_)));

        let mut unknown_design = submission();
        unknown_design.design_id = "404".into();
        assert_matches!(orders.submit(unknown_design).await, Err(OrderError::ValidationError(msg)) if msg.contains("404"));

        assert!(orders.orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn accept_takes_one_unit_per_chosen_size() {
        let (orders, designs) = clients().await;
        let order = orders
            .submit(
                submission()
                    .size(Member::Father, AdultSize::ThreeXl)
                    .size(Member::Son, KidsSize::Age5To6),
            )
            .await
            .unwrap();

        let outcome = orders.accept(&order.id).await.unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Accepted);
        assert_eq!(outcome.decrements.len(), 2);
        assert!(outcome.skipped.is_empty());

        let design = designs.get_design("1".into()).await.unwrap().unwrap();
        assert_eq!(design.inventory.men.get(AdultSize::ThreeXl), 2);
        assert_eq!(design.inventory.boys.get(KidsSize::Age5To6), 5);
    }

    #[tokio::test]
    async fn second_transition_reports_already_processed() {
        let (orders, designs) = clients().await;
        let order = orders
            .submit(submission().size(Member::Father, AdultSize::Xxl))
            .await
            .unwrap();
        orders.accept(&order.id).await.unwrap();
        let after_first = designs.designs().await.unwrap();

        assert_matches!(
            orders.accept(&order.id).await,
            Err(OrderError::AlreadyProcessed { status: OrderStatus::Accepted, .. })
        );
        assert_matches!(orders.reject(&order.id).await, Err(OrderError::AlreadyProcessed { .. }));
        assert_eq!(designs.designs().await.unwrap(), after_first);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_accepts_take_stock_once() {
        let (orders, designs) = clients().await;
        let order = orders
            .submit(submission().size(Member::Father, AdultSize::Xxl))
            .await
            .unwrap();
        let before = designs.get_design("1".into()).await.unwrap().unwrap();

        let first = tokio::spawn({
            let orders = orders.clone();
            let id = order.id.clone();
            async move { orders.accept(&id).await }
        });
        let second = tokio::spawn({
            let orders = orders.clone();
            let id = order.id.clone();
            async move { orders.accept(&id).await }
        });
        let results = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(OrderError::AlreadyProcessed { status: OrderStatus::Accepted, .. }))));
        let after = designs.get_design("1".into()).await.unwrap().unwrap();
        assert_eq!(after.inventory.men.get(AdultSize::Xxl), before.inventory.men.get(AdultSize::Xxl) - 1);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let (orders, _) = clients().await;
        assert_matches!(orders.reject("missing").await, Err(OrderError::NotFound(_)));
    }
}
