//! Salary history rows: what is stored, and what is shown.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use almox_core::{DomainError, Entity};

use crate::employee::EmployeeId;

almox_core::domain_id!(
    /// Identifier of a stored salary change row.
    SalaryChangeId
);

/// Reason shown on the synthetic row carrying the hire salary.
pub const INITIAL_SALARY_REASON: &str = "Salário Inicial";

/// Reason shown on the synthetic row carrying the live current salary.
pub const CURRENT_SALARY_REASON: &str = "Salário Atual";

/// A salary adjustment recorded when a raise was registered.
///
/// `previous_amount` is whatever the employee's salary was when the row was
/// written; it is not trusted when the timeline is rebuilt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryChange {
    pub id: SalaryChangeId,
    pub employee_id: EmployeeId,
    pub previous_amount: Decimal,
    pub new_amount: Decimal,
    pub effective_at: DateTime<Utc>,
    pub reason: String,
}

impl Entity for SalaryChange {
    type Id = SalaryChangeId;

    fn id(&self) -> SalaryChangeId {
        self.id
    }

    fn kind() -> &'static str {
        "salary_change"
    }
}

/// Identity of a row in the reconciled timeline.
///
/// Serialized as `"initial"`, `"current"`, or the stored row's uuid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SalaryEntryId {
    Initial,
    Current,
    Recorded(SalaryChangeId),
}

impl SalaryEntryId {
    pub fn is_synthetic(&self) -> bool {
        match self {
            SalaryEntryId::Initial | SalaryEntryId::Current => true,
            SalaryEntryId::Recorded(_) => false,
        }
    }
}

impl core::fmt::Display for SalaryEntryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SalaryEntryId::Initial => f.write_str("initial"),
            SalaryEntryId::Current => f.write_str("current"),
            SalaryEntryId::Recorded(id) => core::fmt::Display::fmt(id, f),
        }
    }
}

impl core::str::FromStr for SalaryEntryId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial" => Ok(SalaryEntryId::Initial),
            "current" => Ok(SalaryEntryId::Current),
            other => other.parse().map(SalaryEntryId::Recorded),
        }
    }
}

impl Serialize for SalaryEntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SalaryEntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One row of the reconciled salary timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryHistoryEntry {
    pub id: SalaryEntryId,
    pub employee_id: EmployeeId,
    pub previous_amount: Decimal,
    pub new_amount: Decimal,
    pub effective_at: DateTime<Utc>,
    pub reason: String,
}

impl SalaryHistoryEntry {
    pub fn delta(&self) -> Decimal {
        self.new_amount - self.previous_amount
    }
}

/// The employee facts the timeline is anchored on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryBaseline {
    pub employee_id: EmployeeId,
    pub hire_salary: Option<Decimal>,
    pub hire_date: Option<NaiveDate>,
    pub current_salary: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_ids_serialize_as_plain_strings() {
        assert_eq!(
            serde_json::to_string(&SalaryEntryId::Initial).unwrap(),
            "\"initial\""
        );
        assert_eq!(
            serde_json::to_string(&SalaryEntryId::Current).unwrap(),
            "\"current\""
        );

        let recorded = SalaryEntryId::Recorded(SalaryChangeId::generate());
        let json = serde_json::to_string(&recorded).unwrap();
        let back: SalaryEntryId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, recorded);
        assert!(!back.is_synthetic());
    }

    #[test]
    fn unknown_entry_id_fails_to_parse() {
        assert!("latest".parse::<SalaryEntryId>().is_err());
    }
}
