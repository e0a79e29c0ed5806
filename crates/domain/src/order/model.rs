//! The supplier-scoped order.

use chrono::{DateTime, Utc};
use common::{BuyerId, OrderId, SupplierId};
use serde::{Deserialize, Serialize};

use super::{Money, OrderItem, OrderStatus};
use crate::error::DomainError;

/// A sub-order: the part of one checkout that belongs to a single supplier.
///
/// Orders are written once. The total is fixed at creation from the
/// snapshotted item prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: BuyerId,
    pub supplier_id: SupplierId,
    pub items: Vec<OrderItem>,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new `Pending` order and computes its total.
    pub fn new(
        buyer_id: BuyerId,
        supplier_id: SupplierId,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if items.is_empty() {
            return Err(DomainError::NoItems);
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(DomainError::InvalidQuantity {
                product_id: item.product_id,
                quantity: item.quantity,
            });
        }

        let total_amount = items.iter().try_fold(Money::zero(), |total, item| {
            total
                .checked_add(item.total_price()?)
                .ok_or(DomainError::AmountOverflow {
                    product_id: item.product_id,
                })
        })?;

        Ok(Self {
            id: OrderId::new(),
            buyer_id,
            supplier_id,
            items,
            total_amount,
            status: OrderStatus::Pending,
            created_at,
        })
    }

    /// Returns the number of units across all items.
    pub fn unit_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}
