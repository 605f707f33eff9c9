//! Infrastructure layer: repositories, application services, config, wiring.

pub mod bootstrap;
pub mod config;
pub mod repository;
pub mod services;

pub use bootstrap::{Backend, BootstrapError, InMemoryBackend, PostgresBackend, PurchaseOrderBus};
pub use config::{AppConfig, ConfigError, DatabaseConfig};
pub use repository::{
    AggregateRepository, Repository, RepositoryError, SalaryHistoryRepository, SalaryLedger,
};
pub use services::{
    CatalogService, PurchaseOrderMessage, PurchaseOrderService, SalaryService, ServiceError,
};
