use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use almox_core::{DomainError, DomainResult, Entity};
use almox_parties::CompanyId;

almox_core::domain_id!(
    /// Inventory item identifier.
    ItemId
);

/// Input for registering an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub item_id: ItemId,
    pub company_id: Option<CompanyId>,
    /// Natural key; unique across the catalog.
    pub code: String,
    pub name: String,
    pub quantity: i64,
    pub unit_value: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

/// A stock item held by a company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    company_id: Option<CompanyId>,
    code: String,
    name: String,
    quantity: i64,
    unit_value: Option<Decimal>,
    created_at: DateTime<Utc>,
}

impl Item {
    pub fn new(input: NewItem) -> DomainResult<Self> {
        let code = input.code.trim().to_string();
        if code.is_empty() {
            return Err(DomainError::validation("item code cannot be empty"));
        }
        if input.name.trim().is_empty() {
            return Err(DomainError::validation("item name cannot be empty"));
        }
        if input.quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if input.unit_value.is_some_and(|v| v.is_sign_negative()) {
            return Err(DomainError::validation("unit value cannot be negative"));
        }

        Ok(Self {
            id: input.item_id,
            company_id: input.company_id,
            code,
            name: input.name,
            quantity: input.quantity,
            unit_value: input.unit_value,
            created_at: input.occurred_at,
        })
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company_id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_value(&self) -> Option<Decimal> {
        self.unit_value
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Quantity times unit value, when the unit value is known.
    pub fn total_value(&self) -> Option<Decimal> {
        self.unit_value.map(|v| v * Decimal::from(self.quantity))
    }

    /// Adjust stock by `delta`; the quantity can never go negative.
    pub fn adjust_quantity(&mut self, delta: i64) -> DomainResult<()> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let new_quantity = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| DomainError::invariant("quantity overflow"))?;
        if new_quantity < 0 {
            return Err(DomainError::invariant("stock cannot go negative"));
        }
        self.quantity = new_quantity;
        Ok(())
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }

    fn kind() -> &'static str {
        "item"
    }
}
