use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, Entity};
use almox_parties::{CompanyId, Cpf};

use crate::salary::{SalaryBaseline, SalaryChange, SalaryChangeId};

almox_core::domain_id!(
    /// Employee identifier.
    EmployeeId
);

/// Input for registering an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub employee_id: EmployeeId,
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub cpf: Option<Cpf>,
    pub role: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub hire_salary: Option<Decimal>,
    /// Defaults to the hire salary when absent.
    pub current_salary: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    id: EmployeeId,
    company_id: Option<CompanyId>,
    name: String,
    cpf: Option<Cpf>,
    role: Option<String>,
    hire_date: Option<NaiveDate>,
    hire_salary: Option<Decimal>,
    current_salary: Option<Decimal>,
    active: bool,
}

fn ensure_not_negative(amount: Option<Decimal>, what: &str) -> DomainResult<()> {
    if amount.is_some_and(|a| a.is_sign_negative()) {
        return Err(DomainError::validation(format!("{what} cannot be negative")));
    }
    Ok(())
}

impl Employee {
    pub fn new(input: NewEmployee) -> DomainResult<Self> {
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("employee name cannot be empty"));
        }
        ensure_not_negative(input.hire_salary, "hire salary")?;
        ensure_not_negative(input.current_salary, "current salary")?;

        Ok(Self {
            id: input.employee_id,
            company_id: input.company_id,
            name: input.name,
            cpf: input.cpf,
            role: input.role,
            hire_date: input.hire_date,
            hire_salary: input.hire_salary,
            current_salary: input.current_salary.or(input.hire_salary),
            active: true,
        })
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cpf(&self) -> Option<&Cpf> {
        self.cpf.as_ref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn hire_date(&self) -> Option<NaiveDate> {
        self.hire_date
    }

    pub fn hire_salary(&self) -> Option<Decimal> {
        self.hire_salary
    }

    pub fn current_salary(&self) -> Option<Decimal> {
        self.current_salary
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn dismiss(&mut self) {
        self.active = false;
    }

    pub fn baseline(&self) -> SalaryBaseline {
        SalaryBaseline {
            employee_id: self.id,
            hire_salary: self.hire_salary,
            hire_date: self.hire_date,
            current_salary: self.current_salary,
        }
    }

    /// Register a raise (or cut): updates the current salary and returns the
    /// history row to persist alongside the updated employee.
    pub fn record_raise(
        &mut self,
        change_id: SalaryChangeId,
        new_amount: Decimal,
        effective_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> DomainResult<SalaryChange> {
        if new_amount.is_sign_negative() {
            return Err(DomainError::validation("salary cannot be negative"));
        }

        let previous_amount = self
            .current_salary
            .or(self.hire_salary)
            .unwrap_or(Decimal::ZERO);
        if self.current_salary == Some(new_amount) {
            return Err(DomainError::validation(
                "new salary is equal to the current salary",
            ));
        }

        self.current_salary = Some(new_amount);

        Ok(SalaryChange {
            id: change_id,
            employee_id: self.id,
            previous_amount,
            new_amount,
            effective_at,
            reason: reason.into(),
        })
    }
}

impl Entity for Employee {
    type Id = EmployeeId;

    fn id(&self) -> EmployeeId {
        self.id
    }

    fn kind() -> &'static str {
        "employee"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn new_employee(hire_salary: Option<Decimal>) -> NewEmployee {
        NewEmployee {
            employee_id: EmployeeId::generate(),
            company_id: None,
            name: "Maria Souza".to_string(),
            cpf: Some(Cpf::parse("529.982.247-25").unwrap()),
            role: Some("Almoxarife".to_string()),
            hire_date: NaiveDate::from_ymd_opt(2023, 1, 1),
            hire_salary,
            current_salary: None,
        }
    }

    #[test]
    fn current_salary_defaults_to_hire_salary() {
        let employee = Employee::new(new_employee(Some(dec!(3000)))).unwrap();
        assert_eq!(employee.current_salary(), Some(dec!(3000)));
        assert!(employee.is_active());
    }

    #[test]
    fn negative_salaries_are_rejected() {
        let err = Employee::new(new_employee(Some(dec!(-1)))).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn record_raise_captures_previous_salary_and_updates_current() {
        let mut employee = Employee::new(new_employee(Some(dec!(3000)))).unwrap();
        let at = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();

        let change = employee
            .record_raise(SalaryChangeId::generate(), dec!(3500), at, "Promoção")
            .unwrap();

        assert_eq!(change.previous_amount, dec!(3000));
        assert_eq!(change.new_amount, dec!(3500));
        assert_eq!(change.employee_id, Entity::id(&employee));
        assert_eq!(employee.current_salary(), Some(dec!(3500)));
    }

    #[test]
    fn record_raise_refuses_unchanged_or_negative_amounts() {
        let mut employee = Employee::new(new_employee(Some(dec!(3000)))).unwrap();
        let at = Utc::now();

        assert!(
            employee
                .record_raise(SalaryChangeId::generate(), dec!(3000.00), at, "")
                .is_err()
        );
        assert!(
            employee
                .record_raise(SalaryChangeId::generate(), dec!(-10), at, "")
                .is_err()
        );
        assert_eq!(employee.current_salary(), Some(dec!(3000)));
    }

    #[test]
    fn record_raise_without_known_salary_starts_from_zero() {
        let mut employee = Employee::new(new_employee(None)).unwrap();
        let change = employee
            .record_raise(SalaryChangeId::generate(), dec!(2000), Utc::now(), "Contratação")
            .unwrap();
        assert_eq!(change.previous_amount, Decimal::ZERO);
    }
}
