use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, Entity};

use crate::document::Cnpj;

almox_core::domain_id!(
    /// Company identifier.
    CompanyId
);

/// A company owning inventory items and employees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    id: CompanyId,
    name: String,
    cnpj: Cnpj,
    created_at: DateTime<Utc>,
}

impl Company {
    pub fn new(
        id: CompanyId,
        name: impl Into<String>,
        cnpj: Cnpj,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("company name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            cnpj,
            created_at,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cnpj(&self) -> &Cnpj {
        &self.cnpj
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn rename(&mut self, name: impl Into<String>) -> DomainResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("company name cannot be empty"));
        }
        self.name = name;
        Ok(())
    }
}

impl Entity for Company {
    type Id = CompanyId;

    fn id(&self) -> CompanyId {
        self.id
    }

    fn kind() -> &'static str {
        "company"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_rejects_blank_names() {
        let mut company = Company::new(
            CompanyId::generate(),
            "Almox Ltda",
            Cnpj::parse("11222333000181").unwrap(),
            Utc::now(),
        )
        .unwrap();

        assert!(company.rename(" ").is_err());
        assert_eq!(company.name(), "Almox Ltda");

        company.rename("Almox Comércio Ltda").unwrap();
        assert_eq!(company.name(), "Almox Comércio Ltda");
    }
}
