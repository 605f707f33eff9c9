//! Purchasing domain module (purchase requests and their approval workflow).
//!
//! This crate contains the purchase order status engine, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod order;
pub mod status;

pub use order::{
    Approve, ApproveBudget, BudgetApproved, CompletePurchase, PurchaseCompleted, PurchaseOrder,
    PurchaseOrderApproved, PurchaseOrderCommand, PurchaseOrderEvent, PurchaseOrderId,
    PurchaseOrderRecord, PurchaseOrderRejected, PurchaseOrderRequested, Reject, RequestPurchase,
};
pub use status::{PurchaseOrderStatus, RejectionPolicy, Transition};
