//! Application services: load, decide through the domain, persist, notify.
//!
//! Services are generic over their collaborators so tests run against the
//! in-memory repositories and deployments against Postgres.

pub mod catalog;
pub mod error;
pub mod purchasing;
pub mod salary;

pub use catalog::CatalogService;
pub use error::ServiceError;
pub use purchasing::{PurchaseOrderService, PurchaseOrderMessage};
pub use salary::SalaryService;
