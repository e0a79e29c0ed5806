//! Products as seen by checkout.

use common::{ProductId, SupplierId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::order::Money;

/// A catalog product.
///
/// The catalog owns products; checkout only ever mutates `stock`, and only
/// through the inventory ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub supplier_id: SupplierId,
    pub name: String,
    /// Supplier price, markup already applied.
    pub price: Money,
    pub stock: u32,
}

impl Product {
    /// Creates a new product.
    pub fn new(
        id: ProductId,
        supplier_id: SupplierId,
        name: impl Into<String>,
        price: Money,
        stock: u32,
    ) -> Self {
        Self {
            id,
            supplier_id,
            name: name.into(),
            price,
            stock,
        }
    }

    /// Returns true if `quantity` units can be taken from stock.
    pub fn has_stock_for(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }

    /// Returns the display summary for this product.
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            supplier_id: self.supplier_id,
            name: self.name.clone(),
        }
    }

    /// Converts a stock column value, rejecting negatives.
    pub fn stock_from_db(id: ProductId, stock: i64) -> Result<u32, DomainError> {
        u32::try_from(stock).map_err(|_| DomainError::InvalidStock {
            product_id: id,
            stock,
        })
    }
}

/// What a dashboard needs to display an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub supplier_id: SupplierId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_stock_for() {
        let product = Product::new(
            ProductId::new(),
            SupplierId::new(),
            "Widget",
            Money::from_cents(1000),
            5,
        );
        assert!(product.has_stock_for(5));
        assert!(!product.has_stock_for(6));
    }

    #[test]
    fn test_stock_from_db_rejects_negative() {
        let id = ProductId::new();
        assert_eq!(Product::stock_from_db(id, 7), Ok(7));
        assert_eq!(
            Product::stock_from_db(id, -1),
            Err(DomainError::InvalidStock {
                product_id: id,
                stock: -1
            })
        );
    }
}
