//! Personnel domain module (employees and their salary history).
//!
//! Deterministic domain logic only: recording raises and rebuilding the
//! salary timeline shown to users. Storage lives in the infrastructure layer.

pub mod employee;
pub mod reconcile;
pub mod salary;

pub use employee::{Employee, EmployeeId, NewEmployee};
pub use reconcile::{SalaryChartPoint, SalaryTimeline, percent_change, reconcile};
pub use salary::{
    CURRENT_SALARY_REASON, INITIAL_SALARY_REASON, SalaryBaseline, SalaryChange, SalaryChangeId,
    SalaryEntryId, SalaryHistoryEntry,
};
