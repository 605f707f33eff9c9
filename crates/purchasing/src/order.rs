use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use almox_core::{Aggregate, AggregateRoot, DomainError, DomainResult, Entity};
use almox_events::Event;
use almox_parties::SupplierId;

use crate::status::{PurchaseOrderStatus, RejectionPolicy, Transition};

almox_core::domain_id!(
    /// Purchase order identifier.
    PurchaseOrderId
);

/// Aggregate root: PurchaseOrder.
///
/// Invariants:
/// - `rejection_reason` is set iff `status == Rejected`
/// - `approved_at` is unset iff `status == AwaitingApproval`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    id: PurchaseOrderId,
    status: PurchaseOrderStatus,
    description: String,
    requested_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    amount: Option<Decimal>,
    supplier_id: Option<SupplierId>,
    version: u64,
}

/// Flat persisted form of a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderRecord {
    pub id: PurchaseOrderId,
    pub status: PurchaseOrderStatus,
    pub description: String,
    pub requested_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub amount: Option<Decimal>,
    pub supplier_id: Option<SupplierId>,
    pub version: u64,
}

impl PurchaseOrder {
    /// Open a new purchase request. The status is always `AwaitingApproval`.
    pub fn request(cmd: RequestPurchase) -> DomainResult<(Self, PurchaseOrderEvent)> {
        if cmd.amount.is_some_and(|a| a.is_sign_negative()) {
            return Err(DomainError::validation("amount cannot be negative"));
        }

        let event = PurchaseOrderEvent::PurchaseOrderRequested(PurchaseOrderRequested {
            order_id: cmd.order_id,
            description: cmd.description,
            amount: cmd.amount,
            supplier_id: cmd.supplier_id,
            occurred_at: cmd.occurred_at,
        });

        let mut order = Self {
            id: cmd.order_id,
            status: PurchaseOrderStatus::AwaitingApproval,
            description: String::new(),
            requested_at: cmd.occurred_at,
            approved_at: None,
            rejection_reason: None,
            amount: None,
            supplier_id: None,
            version: 0,
        };
        order.apply(&event);
        Ok((order, event))
    }

    /// Rebuild an order from its persisted form, checking its invariants.
    pub fn restore(record: PurchaseOrderRecord) -> DomainResult<Self> {
        let order = Self {
            id: record.id,
            status: record.status,
            description: record.description,
            requested_at: record.requested_at,
            approved_at: record.approved_at,
            rejection_reason: record.rejection_reason,
            amount: record.amount,
            supplier_id: record.supplier_id,
            version: record.version,
        };
        order.check_invariants()?;
        Ok(order)
    }

    pub fn to_record(&self) -> PurchaseOrderRecord {
        PurchaseOrderRecord {
            id: self.id,
            status: self.status,
            description: self.description.clone(),
            requested_at: self.requested_at,
            approved_at: self.approved_at,
            rejection_reason: self.rejection_reason.clone(),
            amount: self.amount,
            supplier_id: self.supplier_id,
            version: self.version,
        }
    }

    pub fn id_typed(&self) -> PurchaseOrderId {
        self.id
    }

    pub fn status(&self) -> PurchaseOrderStatus {
        self.status
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    /// Stamped by the first transition out of `AwaitingApproval`, including
    /// a rejection.
    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        self.rejection_reason.as_deref()
    }

    pub fn amount(&self) -> Option<Decimal> {
        self.amount
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        self.supplier_id
    }

    pub fn check_invariants(&self) -> DomainResult<()> {
        let rejected = self.status == PurchaseOrderStatus::Rejected;
        if rejected != self.rejection_reason.is_some() {
            return Err(DomainError::invariant(
                "rejection reason must be present exactly when the order is rejected",
            ));
        }
        let awaiting = self.status == PurchaseOrderStatus::AwaitingApproval;
        if awaiting == self.approved_at.is_some() {
            return Err(DomainError::invariant(
                "approval timestamp must be absent exactly while awaiting approval",
            ));
        }
        Ok(())
    }

    /// AwaitingApproval -> AwaitingBudget, stamping `approved_at`.
    pub fn approve(&mut self, occurred_at: DateTime<Utc>) -> DomainResult<PurchaseOrderEvent> {
        self.transition(PurchaseOrderCommand::Approve(Approve {
            order_id: self.id,
            occurred_at,
        }))
    }

    /// AwaitingBudget -> BudgetApproved.
    pub fn approve_budget(
        &mut self,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<PurchaseOrderEvent> {
        self.transition(PurchaseOrderCommand::ApproveBudget(ApproveBudget {
            order_id: self.id,
            occurred_at,
        }))
    }

    /// BudgetApproved -> PurchaseCompleted.
    pub fn complete_purchase(
        &mut self,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<PurchaseOrderEvent> {
        self.transition(PurchaseOrderCommand::CompletePurchase(CompletePurchase {
            order_id: self.id,
            occurred_at,
        }))
    }

    /// Any permitted status -> Rejected. An empty reason is accepted.
    pub fn reject(
        &mut self,
        reason: impl Into<String>,
        policy: RejectionPolicy,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<PurchaseOrderEvent> {
        self.transition(PurchaseOrderCommand::Reject(Reject {
            order_id: self.id,
            reason: reason.into(),
            policy,
            occurred_at,
        }))
    }

    fn transition(&mut self, command: PurchaseOrderCommand) -> DomainResult<PurchaseOrderEvent> {
        almox_events::execute(self, &command)?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::invariant("transition produced no event"))
    }
}

impl AggregateRoot for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Entity for PurchaseOrder {
    type Id = PurchaseOrderId;

    fn id(&self) -> PurchaseOrderId {
        self.id
    }

    fn kind() -> &'static str {
        "purchase_order"
    }
}

/// Command: RequestPurchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPurchase {
    pub order_id: PurchaseOrderId,
    pub description: String,
    pub amount: Option<Decimal>,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Approve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approve {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveBudget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveBudget {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompletePurchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletePurchase {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: Reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reject {
    pub order_id: PurchaseOrderId,
    pub reason: String,
    pub policy: RejectionPolicy,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderCommand {
    Approve(Approve),
    ApproveBudget(ApproveBudget),
    CompletePurchase(CompletePurchase),
    Reject(Reject),
}

impl PurchaseOrderCommand {
    pub fn transition(&self) -> Transition {
        match self {
            PurchaseOrderCommand::Approve(_) => Transition::Approve,
            PurchaseOrderCommand::ApproveBudget(_) => Transition::ApproveBudget,
            PurchaseOrderCommand::CompletePurchase(_) => Transition::CompletePurchase,
            PurchaseOrderCommand::Reject(_) => Transition::Reject,
        }
    }

    pub fn order_id(&self) -> PurchaseOrderId {
        match self {
            PurchaseOrderCommand::Approve(c) => c.order_id,
            PurchaseOrderCommand::ApproveBudget(c) => c.order_id,
            PurchaseOrderCommand::CompletePurchase(c) => c.order_id,
            PurchaseOrderCommand::Reject(c) => c.order_id,
        }
    }

    fn rejection_policy(&self) -> RejectionPolicy {
        match self {
            PurchaseOrderCommand::Reject(c) => c.policy,
            PurchaseOrderCommand::Approve(_)
            | PurchaseOrderCommand::ApproveBudget(_)
            | PurchaseOrderCommand::CompletePurchase(_) => RejectionPolicy::default(),
        }
    }
}

/// Event: PurchaseOrderRequested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderRequested {
    pub order_id: PurchaseOrderId,
    pub description: String,
    pub amount: Option<Decimal>,
    pub supplier_id: Option<SupplierId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderApproved {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BudgetApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetApproved {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseCompleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseCompleted {
    pub order_id: PurchaseOrderId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: PurchaseOrderRejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrderRejected {
    pub order_id: PurchaseOrderId,
    pub previous_status: PurchaseOrderStatus,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PurchaseOrderEvent {
    PurchaseOrderRequested(PurchaseOrderRequested),
    PurchaseOrderApproved(PurchaseOrderApproved),
    BudgetApproved(BudgetApproved),
    PurchaseCompleted(PurchaseCompleted),
    PurchaseOrderRejected(PurchaseOrderRejected),
}

impl PurchaseOrderEvent {
    pub fn order_id(&self) -> PurchaseOrderId {
        match self {
            PurchaseOrderEvent::PurchaseOrderRequested(e) => e.order_id,
            PurchaseOrderEvent::PurchaseOrderApproved(e) => e.order_id,
            PurchaseOrderEvent::BudgetApproved(e) => e.order_id,
            PurchaseOrderEvent::PurchaseCompleted(e) => e.order_id,
            PurchaseOrderEvent::PurchaseOrderRejected(e) => e.order_id,
        }
    }
}

impl Event for PurchaseOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PurchaseOrderEvent::PurchaseOrderRequested(_) => "purchasing.order.requested",
            PurchaseOrderEvent::PurchaseOrderApproved(_) => "purchasing.order.approved",
            PurchaseOrderEvent::BudgetApproved(_) => "purchasing.order.budget_approved",
            PurchaseOrderEvent::PurchaseCompleted(_) => "purchasing.order.purchase_completed",
            PurchaseOrderEvent::PurchaseOrderRejected(_) => "purchasing.order.rejected",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PurchaseOrderEvent::PurchaseOrderRequested(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderApproved(e) => e.occurred_at,
            PurchaseOrderEvent::BudgetApproved(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseCompleted(e) => e.occurred_at,
            PurchaseOrderEvent::PurchaseOrderRejected(e) => e.occurred_at,
        }
    }
}

impl Aggregate for PurchaseOrder {
    type Command = PurchaseOrderCommand;
    type Event = PurchaseOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PurchaseOrderEvent::PurchaseOrderRequested(e) => {
                self.id = e.order_id;
                self.status = PurchaseOrderStatus::AwaitingApproval;
                self.description = e.description.clone();
                self.requested_at = e.occurred_at;
                self.approved_at = None;
                self.rejection_reason = None;
                self.amount = e.amount;
                self.supplier_id = e.supplier_id;
            }
            PurchaseOrderEvent::PurchaseOrderApproved(e) => {
                self.status = PurchaseOrderStatus::AwaitingBudget;
                self.approved_at = Some(e.occurred_at);
            }
            PurchaseOrderEvent::BudgetApproved(_) => {
                self.status = PurchaseOrderStatus::BudgetApproved;
            }
            PurchaseOrderEvent::PurchaseCompleted(_) => {
                self.status = PurchaseOrderStatus::PurchaseCompleted;
            }
            PurchaseOrderEvent::PurchaseOrderRejected(e) => {
                self.status = PurchaseOrderStatus::Rejected;
                self.rejection_reason = Some(e.reason.clone());
                // The rejection time lands in the approval column.
                self.approved_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if command.order_id() != self.id {
            return Err(DomainError::invariant("order_id mismatch"));
        }

        let transition = command.transition();
        if self
            .status
            .after(transition, command.rejection_policy())
            .is_none()
        {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                transition.as_str(),
            ));
        }

        let event = match command {
            PurchaseOrderCommand::Approve(cmd) => {
                PurchaseOrderEvent::PurchaseOrderApproved(PurchaseOrderApproved {
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                })
            }
            PurchaseOrderCommand::ApproveBudget(cmd) => {
                PurchaseOrderEvent::BudgetApproved(BudgetApproved {
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                })
            }
            PurchaseOrderCommand::CompletePurchase(cmd) => {
                PurchaseOrderEvent::PurchaseCompleted(PurchaseCompleted {
                    order_id: cmd.order_id,
                    occurred_at: cmd.occurred_at,
                })
            }
            PurchaseOrderCommand::Reject(cmd) => {
                PurchaseOrderEvent::PurchaseOrderRejected(PurchaseOrderRejected {
                    order_id: cmd.order_id,
                    previous_status: self.status,
                    reason: cmd.reason.clone(),
                    occurred_at: cmd.occurred_at,
                })
            }
        };

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn requested_order() -> PurchaseOrder {
        let (order, _) = PurchaseOrder::request(RequestPurchase {
            order_id: PurchaseOrderId::generate(),
            description: "Resmas de papel A4".to_string(),
            amount: Some(dec!(1250.00)),
            supplier_id: Some(SupplierId::generate()),
            occurred_at: test_time(),
        })
        .unwrap();
        order
    }

    fn order_in(status: PurchaseOrderStatus) -> PurchaseOrder {
        let mut order = requested_order();
        let at = test_time() + Duration::hours(1);
        match status {
            PurchaseOrderStatus::AwaitingApproval => {}
            PurchaseOrderStatus::AwaitingBudget => {
                order.approve(at).unwrap();
            }
            PurchaseOrderStatus::BudgetApproved => {
                order.approve(at).unwrap();
                order.approve_budget(at).unwrap();
            }
            PurchaseOrderStatus::PurchaseCompleted => {
                order.approve(at).unwrap();
                order.approve_budget(at).unwrap();
                order.complete_purchase(at).unwrap();
            }
            PurchaseOrderStatus::Rejected => {
                order.reject("fora do orçamento", RejectionPolicy::AnyState, at).unwrap();
            }
        }
        order
    }

    #[test]
    fn request_starts_awaiting_approval() {
        let order = requested_order();
        assert_eq!(order.status(), PurchaseOrderStatus::AwaitingApproval);
        assert_eq!(order.approved_at(), None);
        assert_eq!(order.rejection_reason(), None);
        assert_eq!(order.requested_at(), test_time());
        assert_eq!(AggregateRoot::version(&order), 1);
        order.check_invariants().unwrap();
    }

    #[test]
    fn request_rejects_negative_amount() {
        let err = PurchaseOrder::request(RequestPurchase {
            order_id: PurchaseOrderId::generate(),
            description: "Cadeiras".to_string(),
            amount: Some(dec!(-1)),
            supplier_id: None,
            occurred_at: test_time(),
        })
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn happy_path_walks_every_status() {
        let mut order = requested_order();
        let approved_at = test_time() + Duration::hours(2);

        let event = order.approve(approved_at).unwrap();
        assert!(matches!(event, PurchaseOrderEvent::PurchaseOrderApproved(_)));
        assert_eq!(order.status(), PurchaseOrderStatus::AwaitingBudget);
        assert_eq!(order.approved_at(), Some(approved_at));

        order.approve_budget(approved_at + Duration::days(1)).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::BudgetApproved);
        // Budget approval does not touch the approval stamp.
        assert_eq!(order.approved_at(), Some(approved_at));

        order.complete_purchase(approved_at + Duration::days(2)).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::PurchaseCompleted);
        assert_eq!(order.rejection_reason(), None);
        order.check_invariants().unwrap();
    }

    #[test]
    fn approve_twice_fails_without_changes() {
        let mut order = requested_order();
        order.approve(test_time()).unwrap();
        let before = order.clone();

        let err = order.approve(test_time() + Duration::hours(5)).unwrap_err();
        assert_eq!(
            err,
            DomainError::invalid_transition("awaiting_budget", "approve")
        );
        assert_eq!(order, before);
    }

    #[test]
    fn forward_transitions_out_of_order_fail_and_leave_order_unchanged() {
        let mut order = requested_order();
        let before = order.clone();

        assert!(order.approve_budget(test_time()).unwrap_err().is_invalid_transition());
        assert!(order.complete_purchase(test_time()).unwrap_err().is_invalid_transition());
        assert_eq!(order, before);
    }

    #[test]
    fn scenario_approve_then_reject_then_budget_fails() {
        let mut order = requested_order();
        order.approve(test_time()).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::AwaitingBudget);
        assert!(order.approved_at().is_some());

        let rejected_at = test_time() + Duration::days(3);
        let event = order
            .reject("orçamento inviável", RejectionPolicy::default(), rejected_at)
            .unwrap();
        match event {
            PurchaseOrderEvent::PurchaseOrderRejected(e) => {
                assert_eq!(e.previous_status, PurchaseOrderStatus::AwaitingBudget);
                assert_eq!(e.reason, "orçamento inviável");
            }
            other => panic!("expected rejection event, got {other:?}"),
        }
        assert_eq!(order.status(), PurchaseOrderStatus::Rejected);
        assert_eq!(order.rejection_reason(), Some("orçamento inviável"));

        let err = order.approve_budget(test_time() + Duration::days(4)).unwrap_err();
        assert_eq!(err, DomainError::invalid_transition("rejected", "approve_budget"));
    }

    #[test]
    fn reject_only_touches_status_reason_and_timestamp() {
        for status in [
            PurchaseOrderStatus::AwaitingApproval,
            PurchaseOrderStatus::AwaitingBudget,
            PurchaseOrderStatus::BudgetApproved,
            PurchaseOrderStatus::PurchaseCompleted,
        ] {
            let mut order = order_in(status);
            let before = order.to_record();
            let at = test_time() + Duration::days(10);

            order.reject("", RejectionPolicy::AnyState, at).unwrap();

            let after = order.to_record();
            assert_eq!(after.status, PurchaseOrderStatus::Rejected);
            assert_eq!(after.rejection_reason.as_deref(), Some(""));
            assert_eq!(after.approved_at, Some(at));
            assert_eq!(after.description, before.description);
            assert_eq!(after.requested_at, before.requested_at);
            assert_eq!(after.amount, before.amount);
            assert_eq!(after.supplier_id, before.supplier_id);
            assert_eq!(after.id, before.id);
        }
    }

    #[test]
    fn open_only_policy_refuses_to_reject_completed_purchase() {
        let mut order = order_in(PurchaseOrderStatus::PurchaseCompleted);
        let err = order
            .reject("arrependimento", RejectionPolicy::OpenOnly, test_time())
            .unwrap_err();
        assert_eq!(err, DomainError::invalid_transition("purchase_completed", "reject"));
        assert_eq!(order.status(), PurchaseOrderStatus::PurchaseCompleted);
    }

    #[test]
    fn rejecting_twice_fails() {
        let mut order = order_in(PurchaseOrderStatus::Rejected);
        let err = order
            .reject("outro motivo", RejectionPolicy::AnyState, test_time())
            .unwrap_err();
        assert!(err.is_invalid_transition());
        assert_eq!(order.rejection_reason(), Some("fora do orçamento"));
    }

    #[test]
    fn command_for_another_order_is_refused() {
        let order = requested_order();
        let err = order
            .handle(&PurchaseOrderCommand::Approve(Approve {
                order_id: PurchaseOrderId::generate(),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn restore_rejects_records_breaking_invariants() {
        let mut record = requested_order().to_record();
        record.status = PurchaseOrderStatus::Rejected;
        assert!(PurchaseOrder::restore(record.clone()).is_err());

        record.rejection_reason = Some("sem verba".to_string());
        record.approved_at = Some(test_time());
        let order = PurchaseOrder::restore(record).unwrap();
        assert_eq!(order.status(), PurchaseOrderStatus::Rejected);
    }

    fn transition_strategy() -> impl Strategy<Value = (Transition, RejectionPolicy)> {
        (
            prop_oneof![
                Just(Transition::Approve),
                Just(Transition::ApproveBudget),
                Just(Transition::CompletePurchase),
                Just(Transition::Reject),
            ],
            prop_oneof![Just(RejectionPolicy::AnyState), Just(RejectionPolicy::OpenOnly)],
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any sequence of calls follows the transition table, failed
        /// calls leave the order untouched, and invariants hold after every step.
        #[test]
        fn random_call_sequences_follow_the_table(
            steps in prop::collection::vec(transition_strategy(), 0..12)
        ) {
            let mut order = requested_order();
            let mut at = test_time();

            for (transition, policy) in steps {
                at += Duration::minutes(30);
                let before = order.clone();
                let expected = before.status().after(transition, policy);

                let result = match transition {
                    Transition::Approve => order.approve(at),
                    Transition::ApproveBudget => order.approve_budget(at),
                    Transition::CompletePurchase => order.complete_purchase(at),
                    Transition::Reject => order.reject("motivo", policy, at),
                };

                match expected {
                    Some(next) => {
                        prop_assert!(result.is_ok());
                        prop_assert_eq!(order.status(), next);
                        prop_assert_eq!(
                            AggregateRoot::version(&order),
                            AggregateRoot::version(&before) + 1
                        );
                    }
                    None => {
                        prop_assert!(result.unwrap_err().is_invalid_transition());
                        prop_assert_eq!(&order, &before);
                    }
                }

                prop_assert!(order.check_invariants().is_ok());
            }
        }
    }
}
