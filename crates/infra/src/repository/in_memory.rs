//! In-memory repositories for tests/dev.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use almox_core::{AggregateRoot, Entity, ExpectedVersion};
use almox_personnel::{Employee, EmployeeId, SalaryChange, SalaryChangeId};
use rust_decimal::Decimal;

use super::{
    AggregateRepository, Repository, RepositoryError, SalaryHistoryRepository, SalaryLedger,
};

fn poisoned() -> RepositoryError {
    RepositoryError::Storage("lock poisoned".to_string())
}

/// In-memory keyed store for a single entity type.
///
/// `list` returns records in no particular order.
#[derive(Debug)]
pub struct InMemoryRepository<E: Entity> {
    inner: RwLock<HashMap<E::Id, E>>,
}

impl<E: Entity> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: Entity> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E> Repository<E> for InMemoryRepository<E>
where
    E: Entity + Clone + Send + Sync + 'static,
{
    async fn get(&self, id: E::Id) -> Result<Option<E>, RepositoryError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<E>, RepositoryError> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().cloned().collect())
    }

    async fn create(&self, entity: E) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let id = entity.id();
        if map.contains_key(&id) {
            return Err(RepositoryError::already_exists::<E>(id));
        }
        map.insert(id, entity);
        Ok(())
    }

    async fn update(&self, entity: E) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let id = entity.id();
        match map.get_mut(&id) {
            Some(slot) => {
                *slot = entity;
                Ok(())
            }
            None => Err(RepositoryError::not_found::<E>(id)),
        }
    }

    async fn delete(&self, id: E::Id) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found::<E>(id))
    }
}

#[async_trait]
impl<A> AggregateRepository<A> for InMemoryRepository<A>
where
    A: Entity + AggregateRoot + Clone + Send + Sync + 'static,
{
    async fn update_expecting(
        &self,
        aggregate: A,
        expected: ExpectedVersion,
    ) -> Result<(), RepositoryError> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let id = Entity::id(&aggregate);
        let Some(slot) = map.get_mut(&id) else {
            return Err(RepositoryError::not_found::<A>(id));
        };
        let stored = AggregateRoot::version(slot);
        if !expected.matches(stored) {
            return Err(RepositoryError::version_conflict::<A>(id, expected, stored));
        }
        *slot = aggregate;
        Ok(())
    }
}

/// Salary a raise is measured from.
fn salary_baseline(employee: &Employee) -> Decimal {
    employee
        .current_salary()
        .or(employee.hire_salary())
        .unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Default)]
struct PersonnelState {
    employees: HashMap<EmployeeId, Employee>,
    /// Insertion order is the recording order.
    salary_changes: Vec<SalaryChange>,
}

impl PersonnelState {
    fn change_index(&self, id: SalaryChangeId) -> Option<usize> {
        self.salary_changes.iter().position(|c| c.id == id)
    }
}

/// Employees and their salary history behind a single lock, so a raise
/// updates both or neither.
#[derive(Debug, Default)]
pub struct InMemoryPersonnelStore {
    state: RwLock<PersonnelState>,
}

impl InMemoryPersonnelStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, PersonnelState>, RepositoryError> {
        self.state.read().map_err(|_| poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, PersonnelState>, RepositoryError> {
        self.state.write().map_err(|_| poisoned())
    }
}

#[async_trait]
impl Repository<Employee> for InMemoryPersonnelStore {
    async fn get(&self, id: EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        Ok(self.read()?.employees.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Employee>, RepositoryError> {
        Ok(self.read()?.employees.values().cloned().collect())
    }

    async fn create(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        let id = employee.id();
        if state.employees.contains_key(&id) {
            return Err(RepositoryError::already_exists::<Employee>(id));
        }
        state.employees.insert(id, employee);
        Ok(())
    }

    async fn update(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        let id = employee.id();
        match state.employees.get_mut(&id) {
            Some(slot) => {
                *slot = employee;
                Ok(())
            }
            None => Err(RepositoryError::not_found::<Employee>(id)),
        }
    }

    async fn delete(&self, id: EmployeeId) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if state.employees.remove(&id).is_none() {
            return Err(RepositoryError::not_found::<Employee>(id));
        }
        state.salary_changes.retain(|c| c.employee_id != id);
        Ok(())
    }
}

#[async_trait]
impl Repository<SalaryChange> for InMemoryPersonnelStore {
    async fn get(&self, id: SalaryChangeId) -> Result<Option<SalaryChange>, RepositoryError> {
        let state = self.read()?;
        Ok(state.change_index(id).map(|i| state.salary_changes[i].clone()))
    }

    async fn list(&self) -> Result<Vec<SalaryChange>, RepositoryError> {
        Ok(self.read()?.salary_changes.clone())
    }

    async fn create(&self, change: SalaryChange) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        if state.change_index(change.id).is_some() {
            return Err(RepositoryError::already_exists::<SalaryChange>(change.id));
        }
        if !state.employees.contains_key(&change.employee_id) {
            return Err(RepositoryError::not_found::<Employee>(change.employee_id));
        }
        state.salary_changes.push(change);
        Ok(())
    }

    async fn update(&self, change: SalaryChange) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        match state.change_index(change.id) {
            Some(i) => {
                state.salary_changes[i] = change;
                Ok(())
            }
            None => Err(RepositoryError::not_found::<SalaryChange>(change.id)),
        }
    }

    async fn delete(&self, id: SalaryChangeId) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        match state.change_index(id) {
            Some(i) => {
                state.salary_changes.remove(i);
                Ok(())
            }
            None => Err(RepositoryError::not_found::<SalaryChange>(id)),
        }
    }
}

#[async_trait]
impl SalaryHistoryRepository for InMemoryPersonnelStore {
    async fn list_for_employee(
        &self,
        employee_id: EmployeeId,
    ) -> Result<Vec<SalaryChange>, RepositoryError> {
        Ok(self
            .read()?
            .salary_changes
            .iter()
            .filter(|c| c.employee_id == employee_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SalaryLedger for InMemoryPersonnelStore {
    async fn commit_raise(
        &self,
        employee: Employee,
        change: SalaryChange,
    ) -> Result<(), RepositoryError> {
        let mut state = self.write()?;
        let employee_id = employee.id();

        // Validate everything before touching either collection.
        if change.employee_id != employee_id {
            return Err(RepositoryError::Storage(
                "salary change belongs to another employee".to_string(),
            ));
        }
        let Some(stored) = state.employees.get(&employee_id) else {
            return Err(RepositoryError::not_found::<Employee>(employee_id));
        };
        let stored_salary = salary_baseline(stored);
        if state.change_index(change.id).is_some() {
            return Err(RepositoryError::already_exists::<SalaryChange>(change.id));
        }
        if stored_salary != change.previous_amount {
            return Err(RepositoryError::conflict::<Employee>(
                employee_id,
                format!(
                    "salary is {stored_salary}, raise was computed from {}",
                    change.previous_amount
                ),
            ));
        }

        state.employees.insert(employee_id, employee);
        state.salary_changes.push(change);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    use almox_inventory::{Item, ItemId, NewItem};
    use almox_personnel::NewEmployee;

    fn item(code: &str) -> Item {
        Item::new(NewItem {
            item_id: ItemId::generate(),
            company_id: None,
            code: code.to_string(),
            name: "Grampeador".to_string(),
            quantity: 1,
            unit_value: None,
            occurred_at: Utc::now(),
        })
        .unwrap()
    }

    fn employee() -> Employee {
        Employee::new(NewEmployee {
            employee_id: EmployeeId::generate(),
            company_id: None,
            name: "João Lima".to_string(),
            cpf: None,
            role: None,
            hire_date: None,
            hire_salary: Some(dec!(2000)),
            current_salary: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn crud_contract() {
        let repo = InMemoryRepository::<Item>::new();
        let stapler = item("GRA-01");
        let id = stapler.id();

        assert_eq!(repo.get(id).await.unwrap(), None);
        repo.create(stapler.clone()).await.unwrap();
        assert_eq!(
            repo.create(stapler.clone()).await.unwrap_err(),
            RepositoryError::already_exists::<Item>(id)
        );

        let mut updated = stapler.clone();
        updated.adjust_quantity(4).unwrap();
        repo.update(updated.clone()).await.unwrap();
        assert_eq!(repo.fetch(id).await.unwrap().quantity(), 5);

        repo.delete(id).await.unwrap();
        assert!(matches!(
            repo.delete(id).await.unwrap_err(),
            RepositoryError::NotFound { kind: "item", .. }
        ));
        assert!(matches!(
            repo.update(updated).await.unwrap_err(),
            RepositoryError::NotFound { .. }
        ));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_raise_writes_both_or_nothing() {
        let store = InMemoryPersonnelStore::new();
        let mut maria = employee();
        Repository::<Employee>::create(&store, maria.clone()).await.unwrap();

        let change = maria
            .record_raise(SalaryChangeId::generate(), dec!(2500), Utc::now(), "Mérito")
            .unwrap();
        store.commit_raise(maria.clone(), change.clone()).await.unwrap();

        let stored = Repository::<Employee>::fetch(&store, maria.id()).await.unwrap();
        assert_eq!(stored.current_salary(), Some(dec!(2500)));
        assert_eq!(store.list_for_employee(maria.id()).await.unwrap(), vec![change.clone()]);

        // Replaying the same row fails and leaves the employee untouched.
        let mut replay = maria.clone();
        let _ = replay.record_raise(SalaryChangeId::generate(), dec!(9999), Utc::now(), "");
        let err = store.commit_raise(replay, change).await.unwrap_err();
        assert!(matches!(err, RepositoryError::AlreadyExists { .. }));
        let stored = Repository::<Employee>::fetch(&store, maria.id()).await.unwrap();
        assert_eq!(stored.current_salary(), Some(dec!(2500)));
    }

    #[tokio::test]
    async fn overlapping_raises_cannot_both_commit() {
        let store = InMemoryPersonnelStore::new();
        let maria = employee();
        Repository::<Employee>::create(&store, maria.clone()).await.unwrap();

        // Two callers read the same employee, then both decide a raise.
        let mut first = maria.clone();
        let mut second = maria.clone();
        let first_change = first
            .record_raise(SalaryChangeId::generate(), dec!(2300), Utc::now(), "Mérito")
            .unwrap();
        let second_change = second
            .record_raise(SalaryChangeId::generate(), dec!(2400), Utc::now(), "Dissídio")
            .unwrap();

        store.commit_raise(first, first_change.clone()).await.unwrap();
        let err = store.commit_raise(second, second_change).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { kind: "employee", .. }));

        let stored = Repository::<Employee>::fetch(&store, maria.id()).await.unwrap();
        assert_eq!(stored.current_salary(), Some(dec!(2300)));
        assert_eq!(store.list_for_employee(maria.id()).await.unwrap(), vec![first_change]);
    }

    #[tokio::test]
    async fn versioned_update_is_a_compare_and_swap() {
        use almox_purchasing::{PurchaseOrder, PurchaseOrderId, RejectionPolicy, RequestPurchase};

        let repo = InMemoryRepository::<PurchaseOrder>::new();
        let (order, _) = PurchaseOrder::request(RequestPurchase {
            order_id: PurchaseOrderId::generate(),
            description: "Luvas".to_string(),
            amount: None,
            supplier_id: None,
            occurred_at: Utc::now(),
        })
        .unwrap();
        repo.create(order.clone()).await.unwrap();

        let mut approved = order.clone();
        approved.approve(Utc::now()).unwrap();
        let mut rejected = order.clone();
        rejected
            .reject("sem verba", RejectionPolicy::AnyState, Utc::now())
            .unwrap();

        repo.update_expecting(approved.clone(), ExpectedVersion::Exact(1))
            .await
            .unwrap();
        let err = repo
            .update_expecting(rejected.clone(), ExpectedVersion::Exact(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { kind: "purchase_order", .. }));
        assert_eq!(repo.fetch(approved.id_typed()).await.unwrap(), approved);

        // `Any` skips the check.
        repo.update_expecting(rejected.clone(), ExpectedVersion::Any)
            .await
            .unwrap();

        repo.delete(order.id_typed()).await.unwrap();
        let err = repo
            .update_expecting(order, ExpectedVersion::Exact(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn history_rows_require_an_existing_employee() {
        let store = InMemoryPersonnelStore::new();
        let mut ghost = employee();
        let change = ghost
            .record_raise(SalaryChangeId::generate(), dec!(2100), Utc::now(), "")
            .unwrap();

        let err = Repository::<SalaryChange>::create(&store, change).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { kind: "employee", .. }));
    }
}
