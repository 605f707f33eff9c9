//! Wiring: configuration -> logging -> storage backend -> services.

use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::info;

use almox_events::InMemoryEventBus;
use almox_inventory::Item;
use almox_parties::{Company, Supplier};
use almox_purchasing::{PurchaseOrder, RejectionPolicy};

use crate::config::{AppConfig, ConfigError, DatabaseConfig};
use crate::repository::{
    InMemoryPersonnelStore, InMemoryRepository, PostgresDocumentRepository, PostgresPersonnelStore,
    PostgresPurchaseOrderRepository,
};
use crate::services::purchasing::PurchaseOrderMessage;
use crate::services::{CatalogService, PurchaseOrderService, SalaryService};

const SCHEMA: &str = include_str!("../migrations/0001_schema.sql");

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(String),
}

/// In-process notification bus shared by every backend.
pub type PurchaseOrderBus = Arc<InMemoryEventBus<PurchaseOrderMessage>>;

/// Everything held in memory; for tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    pub orders: Arc<InMemoryRepository<PurchaseOrder>>,
    pub personnel: Arc<InMemoryPersonnelStore>,
    pub items: Arc<InMemoryRepository<Item>>,
    pub suppliers: Arc<InMemoryRepository<Supplier>>,
    pub companies: Arc<InMemoryRepository<Company>>,
    pub bus: PurchaseOrderBus,
    pub rejection_policy: RejectionPolicy,
}

impl InMemoryBackend {
    pub fn new(rejection_policy: RejectionPolicy) -> Self {
        Self {
            rejection_policy,
            ..Self::default()
        }
    }

    pub fn purchase_orders(
        &self,
    ) -> PurchaseOrderService<Arc<InMemoryRepository<PurchaseOrder>>, PurchaseOrderBus> {
        PurchaseOrderService::new(self.orders.clone(), self.bus.clone())
            .with_policy(self.rejection_policy)
    }

    pub fn salaries(&self) -> SalaryService<Arc<InMemoryPersonnelStore>> {
        SalaryService::new(self.personnel.clone())
    }

    pub fn catalog(
        &self,
    ) -> CatalogService<
        Arc<InMemoryRepository<Item>>,
        Arc<InMemoryRepository<Supplier>>,
        Arc<InMemoryRepository<Company>>,
    > {
        CatalogService::new(
            self.items.clone(),
            self.suppliers.clone(),
            self.companies.clone(),
        )
    }
}

/// Postgres-backed storage; events are still distributed in-process.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
    bus: PurchaseOrderBus,
    rejection_policy: RejectionPolicy,
}

impl PostgresBackend {
    pub async fn connect(
        config: &DatabaseConfig,
        rejection_policy: RejectionPolicy,
    ) -> Result<Self, BootstrapError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| BootstrapError::Database(format!("failed to connect: {e}")))?;

        Ok(Self {
            pool,
            bus: PurchaseOrderBus::default(),
            rejection_policy,
        })
    }

    /// Create missing tables; idempotent.
    pub async fn migrate(&self) -> Result<(), BootstrapError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| BootstrapError::Database(format!("failed to apply schema: {e}")))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn bus(&self) -> &PurchaseOrderBus {
        &self.bus
    }

    pub fn purchase_orders(
        &self,
    ) -> PurchaseOrderService<PostgresPurchaseOrderRepository, PurchaseOrderBus> {
        PurchaseOrderService::new(
            PostgresPurchaseOrderRepository::new(self.pool.clone()),
            self.bus.clone(),
        )
        .with_policy(self.rejection_policy)
    }

    pub fn salaries(&self) -> SalaryService<PostgresPersonnelStore> {
        SalaryService::new(PostgresPersonnelStore::new(self.pool.clone()))
    }

    pub fn catalog(
        &self,
    ) -> CatalogService<
        PostgresDocumentRepository<Item>,
        PostgresDocumentRepository<Supplier>,
        PostgresDocumentRepository<Company>,
    > {
        CatalogService::new(
            PostgresDocumentRepository::new(self.pool.clone()),
            PostgresDocumentRepository::new(self.pool.clone()),
            PostgresDocumentRepository::new(self.pool.clone()),
        )
    }
}

#[derive(Debug)]
pub enum Backend {
    InMemory(InMemoryBackend),
    Postgres(PostgresBackend),
}

impl Backend {
    /// Read the environment, start logging and open the configured storage.
    pub async fn from_env() -> Result<Self, BootstrapError> {
        let config = AppConfig::from_env()?;
        Self::from_config(&config).await
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, BootstrapError> {
        almox_observability::init_with(&config.log);

        match &config.database {
            Some(database) => {
                let backend = PostgresBackend::connect(database, config.rejection_policy).await?;
                backend.migrate().await?;
                info!(max_connections = database.max_connections, "using postgres backend");
                Ok(Backend::Postgres(backend))
            }
            None => {
                info!("using in-memory backend");
                Ok(Backend::InMemory(InMemoryBackend::new(config.rejection_policy)))
            }
        }
    }

    pub fn rejection_policy(&self) -> RejectionPolicy {
        match self {
            Backend::InMemory(backend) => backend.rejection_policy,
            Backend::Postgres(backend) => backend.rejection_policy,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use almox_events::EventBus;
    use almox_inventory::{ItemId, NewItem};
    use almox_observability::LogConfig;
    use almox_personnel::{EmployeeId, NewEmployee};
    use almox_purchasing::PurchaseOrderStatus;

    use super::*;

    #[test]
    fn money_columns_keep_every_decimal_place() {
        for column in [
            "amount",
            "hire_salary",
            "current_salary",
            "previous_amount",
            "new_amount",
        ] {
            let line = SCHEMA
                .lines()
                .find(|l| l.trim_start().starts_with(column))
                .unwrap();
            let ty = line.split_whitespace().nth(1).unwrap();
            assert_eq!(ty, "NUMERIC", "{column} is declared as {line:?}");
        }
    }

    #[tokio::test]
    async fn without_database_url_the_backend_is_in_memory() {
        let config = AppConfig {
            database: None,
            log: LogConfig::default(),
            rejection_policy: RejectionPolicy::OpenOnly,
        };
        let backend = Backend::from_config(&config).await.unwrap();
        assert_eq!(backend.rejection_policy(), RejectionPolicy::OpenOnly);

        let Backend::InMemory(backend) = backend else {
            panic!("expected the in-memory backend");
        };
        assert_eq!(backend.purchase_orders().policy(), RejectionPolicy::OpenOnly);
    }

    #[tokio::test]
    async fn services_share_the_backend_state() {
        let backend = InMemoryBackend::new(RejectionPolicy::AnyState);
        let sub = backend.bus.subscribe();

        let order = backend
            .purchase_orders()
            .request("Toner".into(), Some(dec!(480)), None)
            .await
            .unwrap();
        let approved = backend.purchase_orders().approve(order.id_typed()).await.unwrap();
        assert_eq!(approved.status(), PurchaseOrderStatus::AwaitingBudget);
        assert_eq!(sub.drain().len(), 2);

        let employee = backend
            .salaries()
            .register_employee(NewEmployee {
                employee_id: EmployeeId::generate(),
                company_id: None,
                name: "Carlos Dias".into(),
                cpf: None,
                role: None,
                hire_date: None,
                hire_salary: Some(dec!(1800)),
                current_salary: None,
            })
            .await
            .unwrap();
        assert_eq!(backend.salaries().list().await.unwrap(), vec![employee]);

        backend
            .catalog()
            .register_item(NewItem {
                item_id: ItemId::generate(),
                company_id: None,
                code: "TON-01".into(),
                name: "Toner".into(),
                quantity: 2,
                unit_value: Some(dec!(240)),
                occurred_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(!backend.catalog().is_item_code_available("TON-01").await.unwrap());
    }
}
