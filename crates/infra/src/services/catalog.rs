use chrono::Utc;
use tracing::{info, instrument};

use almox_core::{DomainError, Entity};
use almox_inventory::{Item, ItemId, NewItem};
use almox_parties::{Cnpj, Company, CompanyId, ContactInfo, Supplier, SupplierId};

use crate::repository::Repository;

use super::ServiceError;

/// Items, suppliers and companies: the records purchase orders and
/// employees refer to.
#[derive(Debug)]
pub struct CatalogService<I, S, C> {
    items: I,
    suppliers: S,
    companies: C,
}

impl<I, S, C> CatalogService<I, S, C>
where
    I: Repository<Item>,
    S: Repository<Supplier>,
    C: Repository<Company>,
{
    pub fn new(items: I, suppliers: S, companies: C) -> Self {
        Self {
            items,
            suppliers,
            companies,
        }
    }

    /// Whether no registered item uses `code` (compared after trimming).
    pub async fn is_item_code_available(&self, code: &str) -> Result<bool, ServiceError> {
        let code = code.trim();
        let items = self.items.list().await?;
        Ok(!items.iter().any(|item| item.code() == code))
    }

    /// Register an item. Duplicate codes are a `Conflict`; a referenced
    /// company must exist.
    #[instrument(skip(self, input), fields(item_id = %input.item_id, code = %input.code), err)]
    pub async fn register_item(&self, input: NewItem) -> Result<Item, ServiceError> {
        let item = Item::new(input)?;

        if !self.is_item_code_available(item.code()).await? {
            return Err(DomainError::conflict(format!(
                "item code already in use: {}",
                item.code()
            ))
            .into());
        }
        if let Some(company_id) = item.company_id() {
            self.companies.fetch(company_id).await?;
        }

        self.items.create(item.clone()).await?;
        info!("item registered");
        Ok(item)
    }

    pub async fn get_item(&self, id: ItemId) -> Result<Item, ServiceError> {
        Ok(self.items.fetch(id).await?)
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, ServiceError> {
        Ok(self.items.list().await?)
    }

    /// Move stock by `delta` units; stock never goes below zero.
    #[instrument(skip(self), fields(item_id = %id), err)]
    pub async fn adjust_stock(&self, id: ItemId, delta: i64) -> Result<Item, ServiceError> {
        let mut item = self.items.fetch(id).await?;
        item.adjust_quantity(delta)?;
        self.items.update(item.clone()).await?;
        info!(quantity = item.quantity(), "stock adjusted");
        Ok(item)
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    pub async fn delete_item(&self, id: ItemId) -> Result<(), ServiceError> {
        self.items.delete(id).await?;
        info!("item deleted");
        Ok(())
    }

    #[instrument(skip(self, name, contact), err)]
    pub async fn register_supplier(
        &self,
        name: String,
        cnpj: Option<Cnpj>,
        contact: ContactInfo,
    ) -> Result<Supplier, ServiceError> {
        let supplier = Supplier::new(SupplierId::generate(), name, cnpj, contact, Utc::now())?;
        self.suppliers.create(supplier.clone()).await?;
        info!(supplier_id = %supplier.id(), "supplier registered");
        Ok(supplier)
    }

    pub async fn get_supplier(&self, id: SupplierId) -> Result<Supplier, ServiceError> {
        Ok(self.suppliers.fetch(id).await?)
    }

    pub async fn list_suppliers(&self) -> Result<Vec<Supplier>, ServiceError> {
        Ok(self.suppliers.list().await?)
    }

    #[instrument(skip(self, contact), fields(supplier_id = %id), err)]
    pub async fn update_supplier_contact(
        &self,
        id: SupplierId,
        contact: ContactInfo,
    ) -> Result<Supplier, ServiceError> {
        let mut supplier = self.suppliers.fetch(id).await?;
        supplier.update_contact(contact);
        self.suppliers.update(supplier.clone()).await?;
        Ok(supplier)
    }

    #[instrument(skip(self), fields(supplier_id = %id), err)]
    pub async fn deactivate_supplier(&self, id: SupplierId) -> Result<Supplier, ServiceError> {
        let mut supplier = self.suppliers.fetch(id).await?;
        supplier.deactivate();
        self.suppliers.update(supplier.clone()).await?;
        info!("supplier deactivated");
        Ok(supplier)
    }

    /// Register a company. A CNPJ identifies at most one company.
    #[instrument(skip(self, name), fields(cnpj = %cnpj), err)]
    pub async fn register_company(
        &self,
        name: String,
        cnpj: Cnpj,
    ) -> Result<Company, ServiceError> {
        let companies = self.companies.list().await?;
        if companies.iter().any(|c| c.cnpj() == &cnpj) {
            return Err(DomainError::conflict(format!("CNPJ already registered: {cnpj}")).into());
        }

        let company = Company::new(CompanyId::generate(), name, cnpj, Utc::now())?;
        self.companies.create(company.clone()).await?;
        info!("company registered");
        Ok(company)
    }

    pub async fn get_company(&self, id: CompanyId) -> Result<Company, ServiceError> {
        Ok(self.companies.fetch(id).await?)
    }

    pub async fn list_companies(&self) -> Result<Vec<Company>, ServiceError> {
        Ok(self.companies.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use super::*;
    use crate::repository::{InMemoryRepository, RepositoryError};

    type Catalog = CatalogService<
        Arc<InMemoryRepository<Item>>,
        Arc<InMemoryRepository<Supplier>>,
        Arc<InMemoryRepository<Company>>,
    >;

    fn catalog() -> Catalog {
        CatalogService::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
        )
    }

    fn new_item(code: &str, company_id: Option<CompanyId>) -> NewItem {
        NewItem {
            item_id: ItemId::generate(),
            company_id,
            code: code.to_string(),
            name: "Papel A4".to_string(),
            quantity: 10,
            unit_value: Some(dec!(25.90)),
            occurred_at: Utc::now(),
        }
    }

    fn cnpj() -> Cnpj {
        Cnpj::parse("11.222.333/0001-81").unwrap()
    }

    #[tokio::test]
    async fn item_codes_are_unique() {
        let catalog = catalog();
        catalog.register_item(new_item("PAP-A4", None)).await.unwrap();

        assert!(!catalog.is_item_code_available(" PAP-A4 ").await.unwrap());
        assert!(catalog.is_item_code_available("PAP-A3").await.unwrap());

        let err = catalog
            .register_item(new_item("PAP-A4 ", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
        assert_eq!(catalog.list_items().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn items_must_reference_a_known_company() {
        let catalog = catalog();
        let err = catalog
            .register_item(new_item("PAP-A4", Some(CompanyId::generate())))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Repository(RepositoryError::NotFound { kind: "company", .. })
        ));

        let company = catalog
            .register_company("Almox Ltda".into(), cnpj())
            .await
            .unwrap();
        let item = catalog
            .register_item(new_item("PAP-A4", Some(company.id())))
            .await
            .unwrap();
        assert_eq!(catalog.get_item(item.id()).await.unwrap(), item);
    }

    #[tokio::test]
    async fn stock_adjustments_never_go_negative() {
        let catalog = catalog();
        let item = catalog.register_item(new_item("CAN-AZ", None)).await.unwrap();

        let item = catalog.adjust_stock(item.id(), -4).await.unwrap();
        assert_eq!(item.quantity(), 6);

        let err = catalog.adjust_stock(item.id(), -7).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(_)));
        assert_eq!(catalog.get_item(item.id()).await.unwrap().quantity(), 6);

        catalog.delete_item(item.id()).await.unwrap();
        assert!(catalog.get_item(item.id()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn companies_are_unique_by_cnpj() {
        let catalog = catalog();
        catalog.register_company("Almox Ltda".into(), cnpj()).await.unwrap();
        let err = catalog
            .register_company("Outra".into(), cnpj())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
        assert_eq!(catalog.list_companies().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn supplier_lifecycle() {
        let catalog = catalog();
        let supplier = catalog
            .register_supplier("Papelaria Central".into(), Some(cnpj()), ContactInfo::default())
            .await
            .unwrap();
        assert!(supplier.is_active());

        let contact = ContactInfo {
            email: Some("vendas@papelaria.com.br".into()),
            ..ContactInfo::default()
        };
        let updated = catalog
            .update_supplier_contact(supplier.id(), contact.clone())
            .await
            .unwrap();
        assert_eq!(updated.contact(), &contact);

        let inactive = catalog.deactivate_supplier(supplier.id()).await.unwrap();
        assert!(!inactive.is_active());
        assert_eq!(catalog.list_suppliers().await.unwrap(), vec![inactive.clone()]);
        assert_eq!(catalog.get_supplier(supplier.id()).await.unwrap(), inactive);

        assert!(
            catalog
                .register_supplier("  ".into(), None, ContactInfo::default())
                .await
                .is_err()
        );
    }
}
