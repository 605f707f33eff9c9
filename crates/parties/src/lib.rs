//! Parties domain module (suppliers and companies).
//!
//! Plain records with their validation rules; no IO, no storage.

pub mod company;
pub mod document;
pub mod supplier;

pub use company::{Company, CompanyId};
pub use document::{Cnpj, Cpf};
pub use supplier::{ContactInfo, Supplier, SupplierId};
