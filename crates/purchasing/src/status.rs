//! Purchase order status lifecycle and its transition table.
//!
//! ```text
//! AwaitingApproval --approve--> AwaitingBudget --approve_budget--> BudgetApproved
//!        |                            |                                 |
//!        |                            |                         complete_purchase
//!        |                            |                                 v
//!        +----------reject------------+-----------reject-------- PurchaseCompleted
//!                                     v                                 |
//!                                  Rejected <--reject (AnyState only)---+
//! ```

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use almox_core::DomainError;

/// Purchase order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOrderStatus {
    AwaitingApproval,
    AwaitingBudget,
    BudgetApproved,
    PurchaseCompleted,
    Rejected,
}

/// The operations that move an order between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Approve,
    ApproveBudget,
    CompletePurchase,
    Reject,
}

/// Which statuses a rejection is accepted from.
///
/// `AnyState` keeps the historical behavior where a completed purchase can
/// still be rejected. `OpenOnly` limits rejection to orders that have not
/// reached a terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    #[default]
    AnyState,
    OpenOnly,
}

impl PurchaseOrderStatus {
    pub const ALL: [PurchaseOrderStatus; 5] = [
        PurchaseOrderStatus::AwaitingApproval,
        PurchaseOrderStatus::AwaitingBudget,
        PurchaseOrderStatus::BudgetApproved,
        PurchaseOrderStatus::PurchaseCompleted,
        PurchaseOrderStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseOrderStatus::AwaitingApproval => "awaiting_approval",
            PurchaseOrderStatus::AwaitingBudget => "awaiting_budget",
            PurchaseOrderStatus::BudgetApproved => "budget_approved",
            PurchaseOrderStatus::PurchaseCompleted => "purchase_completed",
            PurchaseOrderStatus::Rejected => "rejected",
        }
    }

    /// Status reached by applying `transition`, or `None` when the transition
    /// is not permitted from this status.
    pub fn after(self, transition: Transition, policy: RejectionPolicy) -> Option<Self> {
        use PurchaseOrderStatus::*;

        match (self, transition) {
            (AwaitingApproval, Transition::Approve) => Some(AwaitingBudget),
            (AwaitingBudget, Transition::ApproveBudget) => Some(BudgetApproved),
            (BudgetApproved, Transition::CompletePurchase) => Some(PurchaseCompleted),

            (AwaitingApproval | AwaitingBudget | BudgetApproved, Transition::Reject) => {
                Some(Rejected)
            }
            (PurchaseCompleted, Transition::Reject) => match policy {
                RejectionPolicy::AnyState => Some(Rejected),
                RejectionPolicy::OpenOnly => None,
            },
            (Rejected, Transition::Reject) => None,

            (
                AwaitingBudget | BudgetApproved | PurchaseCompleted | Rejected,
                Transition::Approve,
            ) => None,
            (
                AwaitingApproval | BudgetApproved | PurchaseCompleted | Rejected,
                Transition::ApproveBudget,
            ) => None,
            (
                AwaitingApproval | AwaitingBudget | PurchaseCompleted | Rejected,
                Transition::CompletePurchase,
            ) => None,
        }
    }
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::ApproveBudget => "approve_budget",
            Transition::CompletePurchase => "complete_purchase",
            Transition::Reject => "reject",
        }
    }
}

impl core::fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::fmt::Display for Transition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PurchaseOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown purchase order status: {s}")))
    }
}

impl FromStr for RejectionPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any_state" => Ok(RejectionPolicy::AnyState),
            "open_only" => Ok(RejectionPolicy::OpenOnly),
            other => Err(DomainError::validation(format!(
                "unknown rejection policy: {other}"
            ))),
        }
    }
}
