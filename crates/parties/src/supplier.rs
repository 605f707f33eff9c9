use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, Entity};

use crate::document::Cnpj;

almox_core::domain_id!(
    /// Supplier identifier.
    SupplierId
);

/// Contact information for a supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A vendor purchase orders can be placed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    id: SupplierId,
    name: String,
    cnpj: Option<Cnpj>,
    contact: ContactInfo,
    active: bool,
    created_at: DateTime<Utc>,
}

impl Supplier {
    pub fn new(
        id: SupplierId,
        name: impl Into<String>,
        cnpj: Option<Cnpj>,
        contact: ContactInfo,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("supplier name cannot be empty"));
        }
        Ok(Self {
            id,
            name,
            cnpj,
            contact,
            active: true,
            created_at,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cnpj(&self) -> Option<&Cnpj> {
        self.cnpj.as_ref()
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replace the contact details.
    pub fn update_contact(&mut self, contact: ContactInfo) {
        self.contact = contact;
    }

    /// Inactive suppliers stay listed but should not receive new orders.
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

impl Entity for Supplier {
    type Id = SupplierId;

    fn id(&self) -> SupplierId {
        self.id
    }

    fn kind() -> &'static str {
        "supplier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_supplier_is_active() {
        let supplier = Supplier::new(
            SupplierId::generate(),
            "Papelaria Central",
            Some(Cnpj::parse("11.222.333/0001-81").unwrap()),
            ContactInfo::default(),
            Utc::now(),
        )
        .unwrap();
        assert!(supplier.is_active());
        assert_eq!(supplier.cnpj().unwrap().digits(), "11222333000181");
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Supplier::new(
            SupplierId::generate(),
            "   ",
            None,
            ContactInfo::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn deactivate_keeps_other_fields() {
        let mut supplier = Supplier::new(
            SupplierId::generate(),
            "Ferragens Sul",
            None,
            ContactInfo::default(),
            Utc::now(),
        )
        .unwrap();
        supplier.deactivate();
        assert!(!supplier.is_active());
        assert_eq!(supplier.name(), "Ferragens Sul");
    }
}
