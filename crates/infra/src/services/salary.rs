use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, instrument};

use almox_personnel::{
    Employee, EmployeeId, NewEmployee, SalaryChange, SalaryChangeId, SalaryTimeline, reconcile,
};

use crate::repository::{Repository, SalaryHistoryRepository, SalaryLedger};

use super::ServiceError;

/// Employees, their raises and the reconciled salary timeline.
#[derive(Debug)]
pub struct SalaryService<S> {
    store: S,
}

impl<S> SalaryService<S>
where
    S: Repository<Employee> + SalaryHistoryRepository + SalaryLedger,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(employee_id = %input.employee_id), err)]
    pub async fn register_employee(&self, input: NewEmployee) -> Result<Employee, ServiceError> {
        let employee = Employee::new(input)?;
        Repository::<Employee>::create(&self.store, employee.clone()).await?;
        info!("employee registered");
        Ok(employee)
    }

    pub async fn get(&self, id: EmployeeId) -> Result<Employee, ServiceError> {
        Ok(Repository::<Employee>::fetch(&self.store, id).await?)
    }

    pub async fn list(&self) -> Result<Vec<Employee>, ServiceError> {
        Ok(Repository::<Employee>::list(&self.store).await?)
    }

    #[instrument(skip(self), fields(employee_id = %id), err)]
    pub async fn dismiss(&self, id: EmployeeId) -> Result<Employee, ServiceError> {
        let mut employee = Repository::<Employee>::fetch(&self.store, id).await?;
        employee.dismiss();
        Repository::<Employee>::update(&self.store, employee.clone()).await?;
        info!("employee dismissed");
        Ok(employee)
    }

    /// Recorded history rows, in recording order, without reconciliation.
    pub async fn history(&self, id: EmployeeId) -> Result<Vec<SalaryChange>, ServiceError> {
        Ok(self.store.list_for_employee(id).await?)
    }

    /// The reconciled timeline; `now` stamps the trailing current-salary row.
    #[instrument(skip(self), fields(employee_id = %id), err)]
    pub async fn timeline(
        &self,
        id: EmployeeId,
        now: DateTime<Utc>,
    ) -> Result<SalaryTimeline, ServiceError> {
        let employee = Repository::<Employee>::fetch(&self.store, id).await?;
        let changes = self.store.list_for_employee(id).await?;
        Ok(reconcile(&employee.baseline(), &changes, now))
    }

    /// Record a raise, writing the employee and the history row atomically.
    #[instrument(skip(self, reason), fields(employee_id = %id), err)]
    pub async fn record_raise(
        &self,
        id: EmployeeId,
        new_amount: Decimal,
        effective_at: DateTime<Utc>,
        reason: String,
    ) -> Result<SalaryChange, ServiceError> {
        let mut employee = Repository::<Employee>::fetch(&self.store, id).await?;
        let change =
            employee.record_raise(SalaryChangeId::generate(), new_amount, effective_at, reason)?;

        self.store.commit_raise(employee, change.clone()).await?;

        info!(
            previous = %change.previous_amount,
            new = %change.new_amount,
            "salary change recorded"
        );
        Ok(change)
    }
}
