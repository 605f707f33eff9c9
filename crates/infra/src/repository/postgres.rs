//! Postgres-backed repositories.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | RepositoryError | Scenario |
//! |-----------------------|-----------------|----------|
//! | `23505` (unique violation) | `AlreadyExists` | Create with a known id |
//! | `23503` (foreign key violation) | `NotFound` | History row for an unknown employee |
//! | Any other / pool / network | `Storage` | |
//!
//! Rows that come back but fail domain validation map to `Corrupt`.
//!
//! The schema lives in `migrations/0001_schema.sql`.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{FromRow, PgPool, Row};
use tracing::{Span, instrument};
use uuid::Uuid;

use almox_core::{DomainError, Entity, ExpectedVersion};
use almox_parties::{CompanyId, Cpf, SupplierId};
use almox_personnel::{Employee, EmployeeId, NewEmployee, SalaryChange, SalaryChangeId};
use almox_purchasing::{PurchaseOrder, PurchaseOrderId, PurchaseOrderRecord};

use super::{
    AggregateRepository, Repository, RepositoryError, SalaryHistoryRepository, SalaryLedger,
};

/// Map SQLx errors to RepositoryError.
///
/// `id` is the key being inserted, if any; only then is a unique violation
/// reported as `AlreadyExists`.
fn map_sqlx_error(
    operation: &str,
    kind: &'static str,
    id: Option<String>,
    err: sqlx::Error,
) -> RepositoryError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match (db_err.code().as_deref(), id) {
                (Some("23505"), Some(id)) => RepositoryError::AlreadyExists { kind, id },
                _ => RepositoryError::Storage(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            RepositoryError::Storage(format!("connection pool closed in {}", operation))
        }
        _ => RepositoryError::Storage(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23503";
        }
    }
    false
}

fn corrupt(kind: &'static str, err: impl core::fmt::Display) -> RepositoryError {
    RepositoryError::Corrupt {
        kind,
        message: err.to_string(),
    }
}

fn version_to_db(version: u64) -> Result<i64, RepositoryError> {
    i64::try_from(version)
        .map_err(|_| RepositoryError::Storage(format!("version {version} out of range")))
}

// ---------------------------------------------------------------------------
// Purchase orders
// ---------------------------------------------------------------------------

/// Purchase orders in the `purchase_orders` table, one typed column per field.
#[derive(Debug, Clone)]
pub struct PostgresPurchaseOrderRepository {
    pool: Arc<PgPool>,
}

impl PostgresPurchaseOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[derive(Debug)]
struct PurchaseOrderRow {
    id: Uuid,
    status: String,
    description: String,
    requested_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    amount: Option<Decimal>,
    supplier_id: Option<Uuid>,
    version: i64,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for PurchaseOrderRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(PurchaseOrderRow {
            id: row.try_get("id")?,
            status: row.try_get("status")?,
            description: row.try_get("description")?,
            requested_at: row.try_get("requested_at")?,
            approved_at: row.try_get("approved_at")?,
            rejection_reason: row.try_get("rejection_reason")?,
            amount: row.try_get("amount")?,
            supplier_id: row.try_get("supplier_id")?,
            version: row.try_get("version")?,
        })
    }
}

impl TryFrom<PurchaseOrderRow> for PurchaseOrder {
    type Error = DomainError;

    fn try_from(row: PurchaseOrderRow) -> Result<Self, Self::Error> {
        let version = u64::try_from(row.version)
            .map_err(|_| DomainError::invariant(format!("negative version {}", row.version)))?;
        PurchaseOrder::restore(PurchaseOrderRecord {
            id: PurchaseOrderId::from_uuid(row.id),
            status: row.status.parse()?,
            description: row.description,
            requested_at: row.requested_at,
            approved_at: row.approved_at,
            rejection_reason: row.rejection_reason,
            amount: row.amount,
            supplier_id: row.supplier_id.map(SupplierId::from_uuid),
            version,
        })
    }
}

fn order_from_row(row: &sqlx::postgres::PgRow) -> Result<PurchaseOrder, RepositoryError> {
    let row = PurchaseOrderRow::from_row(row).map_err(|e| corrupt("purchase_order", e))?;
    PurchaseOrder::try_from(row).map_err(|e| corrupt("purchase_order", e))
}

const ORDER_COLUMNS: &str = "id, status, description, requested_at, approved_at, \
                             rejection_reason, amount, supplier_id, version";

#[async_trait]
impl Repository<PurchaseOrder> for PostgresPurchaseOrderRepository {
    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn get(&self, id: PurchaseOrderId) -> Result<Option<PurchaseOrder>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM purchase_orders WHERE id = $1"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_purchase_order", "purchase_order", None, e))?;

        row.as_ref().map(order_from_row).transpose()
    }

    #[instrument(skip(self), fields(order_count = tracing::field::Empty), err)]
    async fn list(&self) -> Result<Vec<PurchaseOrder>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM purchase_orders ORDER BY requested_at ASC, id ASC"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_purchase_orders", "purchase_order", None, e))?;

        let orders = rows.iter().map(order_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("order_count", orders.len());
        Ok(orders)
    }

    #[instrument(skip(self, order), fields(order_id = %order.id_typed()), err)]
    async fn create(&self, order: PurchaseOrder) -> Result<(), RepositoryError> {
        let record = order.to_record();
        let query = sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, status, description, requested_at, approved_at,
                rejection_reason, amount, supplier_id, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        );
        bind_order(query, &record)?
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                let id = Some(record.id.to_string());
                map_sqlx_error("insert_purchase_order", "purchase_order", id, e)
            })?;
        Ok(())
    }

    async fn update(&self, order: PurchaseOrder) -> Result<(), RepositoryError> {
        self.update_expecting(order, ExpectedVersion::Any).await
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn delete(&self, id: PurchaseOrderId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM purchase_orders WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_purchase_order", "purchase_order", None, e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found::<PurchaseOrder>(id));
        }
        Ok(())
    }
}

#[async_trait]
impl AggregateRepository<PurchaseOrder> for PostgresPurchaseOrderRepository {
    /// `UPDATE ... WHERE id = $1 AND version = $10`; on no match the stored
    /// version tells `NotFound` from `Conflict`.
    #[instrument(
        skip(self, order),
        fields(order_id = %order.id_typed(), expected = ?expected),
        err
    )]
    async fn update_expecting(
        &self,
        order: PurchaseOrder,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError> {
        let record = order.to_record();
        let expected_db = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(version) => Some(version_to_db(version)?),
        };

        let query = sqlx::query(
            r#"
            UPDATE purchase_orders SET
                status = $2,
                description = $3,
                requested_at = $4,
                approved_at = $5,
                rejection_reason = $6,
                amount = $7,
                supplier_id = $8,
                version = $9
            WHERE id = $1 AND ($10::BIGINT IS NULL OR version = $10)
            "#,
        );
        let result = bind_order(query, &record)?
            .bind(expected_db)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_purchase_order", "purchase_order", None, e))?;

        if result.rows_affected() > 0 {
            return Ok(());
        }
        match self.stored_version(record.id).await? {
            None => Err(RepositoryError::not_found::<PurchaseOrder>(record.id)),
            Some(actual) => Err(RepositoryError::version_conflict::<PurchaseOrder>(
                record.id, expected, actual,
            )),
        }
    }
}

impl PostgresPurchaseOrderRepository {
    async fn stored_version(&self, id: PurchaseOrderId) -> Result<Option<u64>, RepositoryError> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM purchase_orders WHERE id = $1")
                .bind(*id.as_uuid())
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("get_order_version", "purchase_order", None, e))?;

        version
            .map(|v| u64::try_from(v).map_err(|_| corrupt("purchase_order", "negative version")))
            .transpose()
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

/// Binds `$1..$9` in column order.
fn bind_order<'q>(
    query: PgQuery<'q>,
    record: &'q PurchaseOrderRecord,
) -> Result<PgQuery<'q>, RepositoryError> {
    Ok(query
        .bind(*record.id.as_uuid())
        .bind(record.status.as_str())
        .bind(record.description.as_str())
        .bind(record.requested_at)
        .bind(record.approved_at)
        .bind(record.rejection_reason.as_deref())
        .bind(record.amount)
        .bind(record.supplier_id.map(|s| *s.as_uuid()))
        .bind(version_to_db(record.version)?))
}

// ---------------------------------------------------------------------------
// Employees + salary history
// ---------------------------------------------------------------------------

/// Employees and their salary history (`employees`, `salary_changes`).
///
/// `commit_raise` runs in a single transaction.
#[derive(Debug, Clone)]
pub struct PostgresPersonnelStore {
    pool: Arc<PgPool>,
}

impl PostgresPersonnelStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[derive(Debug)]
struct EmployeeRow {
    id: Uuid,
    company_id: Option<Uuid>,
    name: String,
    cpf: Option<String>,
    role: Option<String>,
    hire_date: Option<NaiveDate>,
    hire_salary: Option<Decimal>,
    current_salary: Option<Decimal>,
    active: bool,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for EmployeeRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(EmployeeRow {
            id: row.try_get("id")?,
            company_id: row.try_get("company_id")?,
            name: row.try_get("name")?,
            cpf: row.try_get("cpf")?,
            role: row.try_get("role")?,
            hire_date: row.try_get("hire_date")?,
            hire_salary: row.try_get("hire_salary")?,
            current_salary: row.try_get("current_salary")?,
            active: row.try_get("active")?,
        })
    }
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = DomainError;

    fn try_from(row: EmployeeRow) -> Result<Self, Self::Error> {
        let mut employee = Employee::new(NewEmployee {
            employee_id: EmployeeId::from_uuid(row.id),
            company_id: row.company_id.map(CompanyId::from_uuid),
            name: row.name,
            cpf: row.cpf.as_deref().map(Cpf::parse).transpose()?,
            role: row.role,
            hire_date: row.hire_date,
            hire_salary: row.hire_salary,
            current_salary: row.current_salary,
        })?;
        if !row.active {
            employee.dismiss();
        }
        Ok(employee)
    }
}

fn employee_from_row(row: &sqlx::postgres::PgRow) -> Result<Employee, RepositoryError> {
    let row = EmployeeRow::from_row(row).map_err(|e| corrupt("employee", e))?;
    Employee::try_from(row).map_err(|e| corrupt("employee", e))
}

#[derive(Debug)]
struct SalaryChangeRow {
    id: Uuid,
    employee_id: Uuid,
    previous_amount: Decimal,
    new_amount: Decimal,
    effective_at: DateTime<Utc>,
    reason: String,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for SalaryChangeRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(SalaryChangeRow {
            id: row.try_get("id")?,
            employee_id: row.try_get("employee_id")?,
            previous_amount: row.try_get("previous_amount")?,
            new_amount: row.try_get("new_amount")?,
            effective_at: row.try_get("effective_at")?,
            reason: row.try_get("reason")?,
        })
    }
}

impl From<SalaryChangeRow> for SalaryChange {
    fn from(row: SalaryChangeRow) -> Self {
        SalaryChange {
            id: SalaryChangeId::from_uuid(row.id),
            employee_id: EmployeeId::from_uuid(row.employee_id),
            previous_amount: row.previous_amount,
            new_amount: row.new_amount,
            effective_at: row.effective_at,
            reason: row.reason,
        }
    }
}

fn change_from_row(row: &sqlx::postgres::PgRow) -> Result<SalaryChange, RepositoryError> {
    SalaryChangeRow::from_row(row)
        .map(SalaryChange::from)
        .map_err(|e| corrupt("salary_change", e))
}

const EMPLOYEE_COLUMNS: &str =
    "id, company_id, name, cpf, role, hire_date, hire_salary, current_salary, active";

const CHANGE_COLUMNS: &str = "id, employee_id, previous_amount, new_amount, effective_at, reason";

const UPDATE_EMPLOYEE: &str = r#"
    UPDATE employees SET
        company_id = $2,
        name = $3,
        cpf = $4,
        role = $5,
        hire_date = $6,
        hire_salary = $7,
        current_salary = $8,
        active = $9
    WHERE id = $1
"#;

/// `UPDATE_EMPLOYEE` guarded on the salary the raise was computed from.
const RAISE_EMPLOYEE: &str = r#"
    UPDATE employees SET
        company_id = $2,
        name = $3,
        cpf = $4,
        role = $5,
        hire_date = $6,
        hire_salary = $7,
        current_salary = $8,
        active = $9
    WHERE id = $1 AND COALESCE(current_salary, hire_salary, 0) = $10
"#;

const INSERT_CHANGE: &str = r#"
    INSERT INTO salary_changes (
        id, employee_id, previous_amount, new_amount, effective_at, reason
    )
    VALUES ($1, $2, $3, $4, $5, $6)
"#;

fn insert_change_error(change: &SalaryChange, err: sqlx::Error) -> RepositoryError {
    if is_foreign_key_violation(&err) {
        return RepositoryError::not_found::<Employee>(change.employee_id);
    }
    map_sqlx_error("insert_salary_change", "salary_change", Some(change.id.to_string()), err)
}

fn bind_employee<'q>(query: PgQuery<'q>, employee: &'q Employee) -> PgQuery<'q> {
    query
        .bind(*employee.id().as_uuid())
        .bind(employee.company_id().map(|c| *c.as_uuid()))
        .bind(employee.name())
        .bind(employee.cpf().map(|c| c.digits()))
        .bind(employee.role())
        .bind(employee.hire_date())
        .bind(employee.hire_salary())
        .bind(employee.current_salary())
        .bind(employee.is_active())
}

fn bind_change<'q>(query: PgQuery<'q>, change: &'q SalaryChange) -> PgQuery<'q> {
    query
        .bind(*change.id.as_uuid())
        .bind(*change.employee_id.as_uuid())
        .bind(change.previous_amount)
        .bind(change.new_amount)
        .bind(change.effective_at)
        .bind(change.reason.as_str())
}

#[async_trait]
impl Repository<Employee> for PostgresPersonnelStore {
    #[instrument(skip(self), fields(employee_id = %id), err)]
    async fn get(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_employee", "employee", None, e))?;

        row.as_ref().map(employee_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Employee>, RepositoryError> {
        let sql = format!("SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY name ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_employees", "employee", None, e))?;

        rows.iter().map(employee_from_row).collect()
    }

    #[instrument(skip(self, employee), fields(employee_id = %employee.id()), err)]
    async fn create(&self, employee: Employee) -> Result<(), RepositoryError> {
        let query = sqlx::query(
            r#"
            INSERT INTO employees (
                id, company_id, name, cpf, role, hire_date, hire_salary, current_salary, active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        );
        bind_employee(query, &employee)
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                let id = Some(employee.id().to_string());
                map_sqlx_error("insert_employee", "employee", id, e)
            })?;
        Ok(())
    }

    #[instrument(skip(self, employee), fields(employee_id = %employee.id()), err)]
    async fn update(&self, employee: Employee) -> Result<(), RepositoryError> {
        let result = bind_employee(sqlx::query(UPDATE_EMPLOYEE), &employee)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_employee", "employee", None, e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found::<Employee>(employee.id()));
        }
        Ok(())
    }

    /// Salary history rows go with the employee (`ON DELETE CASCADE`).
    #[instrument(skip(self), fields(employee_id = %id), err)]
    async fn delete(&self, id: EmployeeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_employee", "employee", None, e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found::<Employee>(id));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository<SalaryChange> for PostgresPersonnelStore {
    #[instrument(skip(self), fields(change_id = %id), err)]
    async fn get(&self, id: SalaryChangeId) -> Result<Option<SalaryChange>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {CHANGE_COLUMNS} FROM salary_changes WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_salary_change", "salary_change", None, e))?;

        row.as_ref().map(change_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<SalaryChange>, RepositoryError> {
        let sql = format!("SELECT {CHANGE_COLUMNS} FROM salary_changes ORDER BY seq ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_salary_changes", "salary_change", None, e))?;

        rows.iter().map(change_from_row).collect()
    }

    #[instrument(skip(self, change), fields(change_id = %change.id), err)]
    async fn create(&self, change: SalaryChange) -> Result<(), RepositoryError> {
        bind_change(sqlx::query(INSERT_CHANGE), &change)
            .execute(&*self.pool)
            .await
            .map_err(|e| insert_change_error(&change, e))?;
        Ok(())
    }

    #[instrument(skip(self, change), fields(change_id = %change.id), err)]
    async fn update(&self, change: SalaryChange) -> Result<(), RepositoryError> {
        let query = sqlx::query(
            r#"
            UPDATE salary_changes SET
                employee_id = $2,
                previous_amount = $3,
                new_amount = $4,
                effective_at = $5,
                reason = $6
            WHERE id = $1
            "#,
        );
        let result = bind_change(query, &change)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_salary_change", "salary_change", None, e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found::<SalaryChange>(change.id));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(change_id = %id), err)]
    async fn delete(&self, id: SalaryChangeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM salary_changes WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_salary_change", "salary_change", None, e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found::<SalaryChange>(id));
        }
        Ok(())
    }
}

#[async_trait]
impl SalaryHistoryRepository for PostgresPersonnelStore {
    #[instrument(
        skip(self),
        fields(employee_id = %employee_id, change_count = tracing::field::Empty),
        err
    )]
    async fn list_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<SalaryChange>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CHANGE_COLUMNS} FROM salary_changes WHERE employee_id = $1 ORDER BY seq ASC"
        ))
        .bind(*employee_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_salary_changes_for_employee", "salary_change", None, e))?;

        let changes = rows.iter().map(change_from_row).collect::<Result<Vec<_>, _>>()?;
        Span::current().record("change_count", changes.len());
        Ok(changes)
    }
}

#[async_trait]
impl SalaryLedger for PostgresPersonnelStore {
    #[instrument(
        skip(self, employee, change),
        fields(employee_id = %employee.id(), change_id = %change.id),
        err
    )]
    async fn commit_raise(
        &self,
        employee: Employee,
        change: SalaryChange,
    ) -> Result<(), RepositoryError> {
        if change.employee_id != employee.id() {
            return Err(RepositoryError::Storage(
                "salary change belongs to another employee".to_string(),
            ));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", "employee", None, e))?;

        let updated = bind_employee(sqlx::query(RAISE_EMPLOYEE), &employee)
            .bind(change.previous_amount)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_employee", "employee", None, e))?;

        if updated.rows_affected() == 0 {
            let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM employees WHERE id = $1")
                .bind(*employee.id().as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("get_employee", "employee", None, e))?;
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", "employee", None, e))?;
            return Err(match exists {
                None => RepositoryError::not_found::<Employee>(employee.id()),
                Some(_) => RepositoryError::conflict::<Employee>(
                    employee.id(),
                    format!("salary is no longer {}", change.previous_amount),
                ),
            });
        }

        // Dropping `tx` on error rolls back the employee update.
        bind_change(sqlx::query(INSERT_CHANGE), &change)
            .execute(&mut *tx)
            .await
            .map_err(|e| insert_change_error(&change, e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", "salary_change", None, e))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalog documents
// ---------------------------------------------------------------------------

/// Catalog entities (items, suppliers, companies) stored as JSONB documents
/// in the shared `records` table, keyed by `(kind, id)`.
pub struct PostgresDocumentRepository<E> {
    pool: Arc<PgPool>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> PostgresDocumentRepository<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
            _entity: PhantomData,
        }
    }
}

impl<E> Clone for PostgresDocumentRepository<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> PostgresDocumentRepository<E> {
    fn encode(entity: &E) -> Result<serde_json::Value, RepositoryError>
    where
        E: Serialize,
    {
        serde_json::to_value(entity)
            .map_err(|e| RepositoryError::Storage(format!("failed to encode {}: {}", E::kind(), e)))
    }

    fn decode(row: &sqlx::postgres::PgRow) -> Result<E, RepositoryError>
    where
        E: DeserializeOwned,
    {
        let body: serde_json::Value = row.try_get("body").map_err(|e| corrupt(E::kind(), e))?;
        serde_json::from_value(body).map_err(|e| corrupt(E::kind(), e))
    }
}

#[async_trait]
impl<E> Repository<E> for PostgresDocumentRepository<E>
where
    E: Entity + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    #[instrument(skip(self), fields(kind = E::kind(), id = %id), err)]
    async fn get(&self, id: E::Id) -> Result<Option<E>, RepositoryError> {
        let row = sqlx::query("SELECT body FROM records WHERE kind = $1 AND id = $2")
            .bind(E::kind())
            .bind(id.to_string())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_record", E::kind(), None, e))?;

        row.as_ref().map(Self::decode).transpose()
    }

    #[instrument(skip(self), fields(kind = E::kind()), err)]
    async fn list(&self) -> Result<Vec<E>, RepositoryError> {
        let sql = "SELECT body FROM records WHERE kind = $1 ORDER BY created_at ASC, id ASC";
        let rows = sqlx::query(sql)
            .bind(E::kind())
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_records", E::kind(), None, e))?;

        rows.iter().map(Self::decode).collect()
    }

    #[instrument(skip(self, entity), fields(kind = E::kind(), id = %entity.id()), err)]
    async fn create(&self, entity: E) -> Result<(), RepositoryError> {
        let id = entity.id().to_string();
        sqlx::query("INSERT INTO records (kind, id, body) VALUES ($1, $2, $3)")
            .bind(E::kind())
            .bind(&id)
            .bind(Self::encode(&entity)?)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_record", E::kind(), Some(id.clone()), e))?;
        Ok(())
    }

    #[instrument(skip(self, entity), fields(kind = E::kind(), id = %entity.id()), err)]
    async fn update(&self, entity: E) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE records SET body = $3, updated_at = NOW() WHERE kind = $1 AND id = $2",
        )
        .bind(E::kind())
        .bind(entity.id().to_string())
        .bind(Self::encode(&entity)?)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_record", E::kind(), None, e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found::<E>(entity.id()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(kind = E::kind(), id = %id), err)]
    async fn delete(&self, id: E::Id) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM records WHERE kind = $1 AND id = $2")
            .bind(E::kind())
            .bind(id.to_string())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_record", E::kind(), None, e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found::<E>(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order_row(status: &str, approved_at: Option<DateTime<Utc>>) -> PurchaseOrderRow {
        PurchaseOrderRow {
            id: Uuid::now_v7(),
            status: status.to_string(),
            description: "Cadeiras".to_string(),
            requested_at: Utc::now(),
            approved_at,
            rejection_reason: None,
            amount: Some(dec!(1500.00)),
            supplier_id: None,
            version: 2,
        }
    }

    #[test]
    fn order_rows_restore_through_invariants() {
        let row = order_row("budget_approved", Some(Utc::now()));
        let order = PurchaseOrder::try_from(row).unwrap();
        assert_eq!(order.status().as_str(), "budget_approved");
        assert_eq!(order.amount(), Some(dec!(1500.00)));

        assert!(PurchaseOrder::try_from(order_row("shipped", None)).is_err());
        assert!(PurchaseOrder::try_from(order_row("awaiting_budget", None)).is_err());
    }

    #[test]
    fn employee_rows_keep_the_stored_current_salary() {
        let row = EmployeeRow {
            id: Uuid::now_v7(),
            company_id: None,
            name: "Ana Souza".to_string(),
            cpf: Some("52998224725".to_string()),
            role: Some("Almoxarife".to_string()),
            hire_date: NaiveDate::from_ymd_opt(2020, 1, 1),
            hire_salary: Some(dec!(2000)),
            current_salary: Some(dec!(2600)),
            active: false,
        };
        let employee = Employee::try_from(row).unwrap();
        assert_eq!(employee.current_salary(), Some(dec!(2600)));
        assert_eq!(employee.cpf().map(|c| c.digits()), Some("52998224725"));
        assert!(!employee.is_active());
    }
}
