use crate::error::RuleViolation;

/// Quantity left after taking `quantity` out of `on_hand`.
pub fn decrement(product: &str, on_hand: i32, quantity: i32) -> Result<i32, RuleViolation> {
    if quantity > on_hand {
        return Err(RuleViolation::InsufficientStock {
            product: product.to_string(),
        });
    }
    Ok(on_hand - quantity)
}
