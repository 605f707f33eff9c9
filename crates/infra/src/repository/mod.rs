//! Persistence collaborators, one repository per entity.
//!
//! Services only see these traits; the in-memory implementations back tests
//! and local development, the Postgres ones back deployments.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use almox_core::{AggregateRoot, Entity, ExpectedVersion};
use almox_personnel::{Employee, EmployeeId, SalaryChange};

pub use in_memory::{InMemoryPersonnelStore, InMemoryRepository};
pub use postgres::{
    PostgresDocumentRepository, PostgresPersonnelStore, PostgresPurchaseOrderRepository,
};

/// Repository operation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    /// The stored record moved on since it was read.
    #[error("{kind} {id} was modified concurrently: {message}")]
    Conflict {
        kind: &'static str,
        id: String,
        message: String,
    },

    /// A stored row could not be turned back into a valid entity.
    #[error("corrupt {kind} record: {message}")]
    Corrupt { kind: &'static str, message: String },

    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn not_found<E: Entity>(id: E::Id) -> Self {
        Self::NotFound {
            kind: E::kind(),
            id: id.to_string(),
        }
    }

    pub fn already_exists<E: Entity>(id: E::Id) -> Self {
        Self::AlreadyExists {
            kind: E::kind(),
            id: id.to_string(),
        }
    }

    pub fn conflict<E: Entity>(id: E::Id, message: impl Into<String>) -> Self {
        Self::Conflict {
            kind: E::kind(),
            id: id.to_string(),
            message: message.into(),
        }
    }

    pub fn version_conflict<E: Entity>(
        id: E::Id,
        expected: ExpectedVersion,
        actual: u64,
    ) -> Self {
        Self::conflict::<E>(id, format!("expected {expected:?}, found version {actual}"))
    }
}

/// Keyed CRUD over one entity type.
///
/// - `get` of an unknown id is `Ok(None)`
/// - `update`/`delete` of an unknown id is `NotFound`
/// - `create` of a known id is `AlreadyExists`
#[async_trait]
pub trait Repository<E>: Send + Sync
where
    E: Entity + Clone + Send + Sync + 'static,
{
    async fn get(&self, id: E::Id) -> Result<Option<E>, RepositoryError>;

    async fn list(&self) -> Result<Vec<E>, RepositoryError>;

    async fn create(&self, entity: E) -> Result<(), RepositoryError>;

    async fn update(&self, entity: E) -> Result<(), RepositoryError>;

    async fn delete(&self, id: E::Id) -> Result<(), RepositoryError>;

    /// `get`, turning a missing row into `NotFound`.
    async fn fetch(&self, id: E::Id) -> Result<E, RepositoryError> {
        self.get(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found::<E>(id))
    }
}

/// Compare-and-swap writes for aggregates that count their changes.
#[async_trait]
pub trait AggregateRepository<A>: Repository<A>
where
    A: Entity + AggregateRoot + Clone + Send + Sync + 'static,
{
    /// Replace the stored aggregate only while it is still at `expected`.
    ///
    /// An unknown id is `NotFound`; a stored version other than `expected`
    /// is `Conflict` and leaves the record untouched.
    async fn update_expecting(
        &self,
        aggregate: A,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError>;
}

/// Salary history rows queried by their owning employee.
#[async_trait]
pub trait SalaryHistoryRepository: Repository<SalaryChange> {
    /// Rows for one employee, in the order they were recorded.
    async fn list_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<SalaryChange>, RepositoryError>;
}

/// Atomic write of a salary raise.
#[async_trait]
pub trait SalaryLedger: Send + Sync {
    /// Persist the updated employee and the new history row together: either
    /// both land or neither does.
    ///
    /// The stored salary must still be the change's `previous_amount`;
    /// otherwise another raise got there first and the result is `Conflict`.
    async fn commit_raise(
        &self,
        employee: Employee,
        change: SalaryChange,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
impl<E, R> Repository<E> for Arc<R>
where
    E: Entity + Clone + Send + Sync + 'static,
    R: Repository<E> + ?Sized,
{
    async fn get(&self, id: E::Id) -> Result<Option<E>, RepositoryError> {
        (**self).get(id).await
    }

    async fn list(&self) -> Result<Vec<E>, RepositoryError> {
        (**self).list().await
    }

    async fn create(&self, entity: E) -> Result<(), RepositoryError> {
        (**self).create(entity).await
    }

    async fn update(&self, entity: E) -> Result<(), RepositoryError> {
        (**self).update(entity).await
    }

    async fn delete(&self, id: E::Id) -> Result<(), RepositoryError> {
        (**self).delete(id).await
    }
}

#[async_trait]
impl<A, R> AggregateRepository<A> for Arc<R>
where
    A: Entity + AggregateRoot + Clone + Send + Sync + 'static,
    R: AggregateRepository<A> + ?Sized,
{
    async fn update_expecting(
        &self,
        aggregate: A,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError> {
        (**self).update_expecting(aggregate, expected).await
    }
}

#[async_trait]
impl<R> SalaryHistoryRepository for Arc<R>
where
    R: SalaryHistoryRepository + ?Sized,
{
    async fn list_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<SalaryChange>, RepositoryError> {
        (**self).list_for_employee(employee_id).await
    }
}

#[async_trait]
impl<L> SalaryLedger for Arc<L>
where
    L: SalaryLedger + ?Sized,
{
    async fn commit_raise(
        &self,
        employee: Employee,
        change: SalaryChange,
    ) -> Result<(), RepositoryError> {
        (**self).commit_raise(employee, change).await
    }
}
