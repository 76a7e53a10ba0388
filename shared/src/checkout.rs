//! Validation of a cart before it is turned into a reservation.

use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::error::RuleViolation;
use crate::stock;

/// A cart line joined with the product it points at, as read under lock.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub product_name: String,
    pub store_id: Uuid,
    pub stock_quantity: i32,
    pub unit_price: BigDecimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub remaining_stock: i32,
}

/// Everything checkout needs to commit, computed before any write happens.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutPlan {
    pub store_id: Uuid,
    pub lines: Vec<PlannedLine>,
}

/// Checks every line before anything is committed.
///
/// Store mixing is reported ahead of stock shortages regardless of line
/// order, so a two-store cart never reports a stock problem first.
pub fn plan_checkout(lines: &[CartLine]) -> Result<CheckoutPlan, RuleViolation> {
    let first = lines.first().ok_or(RuleViolation::EmptyCart)?;
    let store_id = first.store_id;

    if lines.iter().any(|line| line.store_id != store_id) {
        return Err(RuleViolation::MixedStoreCart);
    }

    let lines = lines
        .iter()
        .map(|line| {
            let remaining_stock =
                stock::decrement(&line.product_name, line.stock_quantity, line.quantity)?;
            Ok(PlannedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: line.unit_price.clone(),
                remaining_stock,
            })
        })
        .collect::<Result<Vec<_>, RuleViolation>>()?;

    Ok(CheckoutPlan { store_id, lines })
}

/// A new cart item must come from the same store as what is already there.
pub fn ensure_same_store(
    existing_store: Option<Uuid>,
    new_store: Uuid,
) -> Result<(), RuleViolation> {
    match existing_store {
        Some(store) if store != new_store => Err(RuleViolation::MixedStoreCart),
        _ => Ok(()),
    }
}
