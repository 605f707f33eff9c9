use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use almox_core::{AggregateRoot, DomainResult, ExpectedVersion};
use almox_events::{EventBus, EventEnvelope};
use almox_parties::SupplierId;
use almox_purchasing::{
    PurchaseOrder, PurchaseOrderEvent, PurchaseOrderId, RejectionPolicy, RequestPurchase,
    Transition,
};

use crate::repository::AggregateRepository;

use super::ServiceError;

/// Message published for every persisted purchase order change.
pub type PurchaseOrderMessage = EventEnvelope<PurchaseOrderEvent>;

const AGGREGATE_TYPE: &str = "purchase_order";

/// Drives purchase orders through their approval workflow.
///
/// Every transition loads the order, lets the domain decide, writes the
/// result only if the stored version is still the one loaded, and then
/// publishes the event. A rejected or conflicting transition leaves the
/// stored order untouched and publishes nothing.
#[derive(Debug)]
pub struct PurchaseOrderService<R, B> {
    orders: R,
    bus: B,
    policy: RejectionPolicy,
}

impl<R, B> PurchaseOrderService<R, B>
where
    R: AggregateRepository<PurchaseOrder>,
    B: EventBus<PurchaseOrderMessage>,
{
    pub fn new(orders: R, bus: B) -> Self {
        Self {
            orders,
            bus,
            policy: RejectionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RejectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RejectionPolicy {
        self.policy
    }

    /// Open a new order in `AwaitingApproval`.
    #[instrument(skip(self, description), err)]
    pub async fn request(
        &self,
        description: String,
        amount: Option<Decimal>,
        supplier_id: Option<SupplierId>,
    ) -> Result<PurchaseOrder, ServiceError> {
        let (order, event) = PurchaseOrder::request(RequestPurchase {
            order_id: PurchaseOrderId::generate(),
            description,
            amount,
            supplier_id,
            occurred_at: Utc::now(),
        })?;

        self.orders.create(order.clone()).await?;
        self.publish(&order, event)?;

        info!(order_id = %order.id_typed(), "purchase order requested");
        Ok(order)
    }

    pub async fn get(&self, id: PurchaseOrderId) -> Result<PurchaseOrder, ServiceError> {
        Ok(self.orders.fetch(id).await?)
    }

    pub async fn list(&self) -> Result<Vec<PurchaseOrder>, ServiceError> {
        Ok(self.orders.list().await?)
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    pub async fn approve(&self, id: PurchaseOrderId) -> Result<PurchaseOrder, ServiceError> {
        self.transition(id, Transition::Approve, |order| order.approve(Utc::now()))
            .await
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    pub async fn approve_budget(&self, id: PurchaseOrderId) -> Result<PurchaseOrder, ServiceError> {
        self.transition(id, Transition::ApproveBudget, |order| {
            order.approve_budget(Utc::now())
        })
        .await
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    pub async fn complete_purchase(
        &self,
        id: PurchaseOrderId,
    ) -> Result<PurchaseOrder, ServiceError> {
        self.transition(id, Transition::CompletePurchase, |order| {
            order.complete_purchase(Utc::now())
        })
        .await
    }

    #[instrument(skip(self, reason), fields(order_id = %id), err)]
    pub async fn reject(
        &self,
        id: PurchaseOrderId,
        reason: String,
    ) -> Result<PurchaseOrder, ServiceError> {
        let policy = self.policy;
        self.transition(id, Transition::Reject, move |order| {
            order.reject(reason, policy, Utc::now())
        })
        .await
    }

    async fn transition<F>(
        &self,
        id: PurchaseOrderId,
        transition: Transition,
        decide: F,
    ) -> Result<PurchaseOrder, ServiceError>
    where
        F: FnOnce(&mut PurchaseOrder) -> DomainResult<PurchaseOrderEvent>,
    {
        let mut order = self.orders.fetch(id).await?;
        let from = order.status();
        let expected = ExpectedVersion::Exact(AggregateRoot::version(&order));

        let event = match decide(&mut order) {
            Ok(event) => event,
            Err(err) => {
                if err.is_invalid_transition() {
                    warn!(order_id = %id, status = %from, %transition, "transition rejected");
                }
                return Err(err.into());
            }
        };

        if let Err(err) = self.orders.update_expecting(order.clone(), expected).await {
            let err = ServiceError::from(err);
            if err.is_conflict() {
                warn!(order_id = %id, status = %from, %transition, "concurrent update lost");
            }
            return Err(err);
        }
        self.publish(&order, event)?;

        info!(order_id = %id, from = %from, to = %order.status(), "purchase order transitioned");
        Ok(order)
    }

    fn publish(
        &self,
        order: &PurchaseOrder,
        event: PurchaseOrderEvent,
    ) -> Result<(), ServiceError> {
        let envelope = EventEnvelope::wrap(
            order.id_typed().0,
            AGGREGATE_TYPE,
            AggregateRoot::version(order),
            event,
        );
        self.bus
            .publish(envelope)
            .map_err(|e| ServiceError::Publish(format!("{:?}", e)))
    }
}
