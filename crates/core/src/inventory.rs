//! Stock movement arithmetic and low-stock rules.

use crate::error::CoreError;

define_text_enum! {
    /// Kind of stock movement.
    TxnType("transaction type") {
        /// Stock received; adds to the balance.
        In = "in",
        /// Stock consumed or issued; subtracts from the balance.
        Out = "out",
        /// Stock count correction; sets the balance to the given quantity.
        Adjust = "adjust",
    }
}

/// Compute the balance after applying a movement.
///
/// `in`/`out` require a positive quantity; `adjust` accepts zero. An `out`
/// larger than the current balance fails with "Insufficient stock".
pub fn apply_transaction(balance: i32, txn: TxnType, quantity: i32) -> Result<i32, CoreError> {
    match txn {
        TxnType::In | TxnType::Out if quantity <= 0 => Err(CoreError::Validation(
            "Quantity must be greater than zero".into(),
        )),
        TxnType::Adjust if quantity < 0 => Err(CoreError::Validation(
            "Adjusted quantity must not be negative".into(),
        )),
        TxnType::In => balance
            .checked_add(quantity)
            .ok_or_else(|| CoreError::Validation("Quantity overflow".into())),
        TxnType::Out if quantity > balance => Err(CoreError::Validation(format!(
            "Insufficient stock: requested {quantity}, available {balance}"
        ))),
        TxnType::Out => Ok(balance - quantity),
        TxnType::Adjust => Ok(quantity),
    }
}

/// An item is low on stock when its balance is at or below the reorder level.
pub fn is_low_stock(quantity: i32, min_quantity: i32) -> bool {
    quantity <= min_quantity
}

/// True only for the movement that takes the balance from above the reorder
/// level to at-or-below it, so repeated OUTs do not re-alert.
pub fn crossed_low_stock(before: i32, after: i32, min_quantity: i32) -> bool {
    !is_low_stock(before, min_quantity) && is_low_stock(after, min_quantity)
}

/// Validate stock-keeping unit codes: 1..=64 chars of letters, digits, `-`, `_`, `.`.
pub fn validate_sku(sku: &str) -> Result<(), CoreError> {
    if sku.is_empty() || sku.len() > 64 {
        return Err(CoreError::Validation(
            "SKU must be between 1 and 64 characters".into(),
        ));
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(CoreError::Validation(format!(
            "SKU '{sku}' may only contain letters, digits, '-', '_' and '.'"
        )));
    }
    Ok(())
}

/// Validate the reorder level.
pub fn validate_min_quantity(min_quantity: i32) -> Result<(), CoreError> {
    if min_quantity < 0 {
        return Err(CoreError::Validation(
            "Minimum quantity must not be negative".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_adds_to_balance() {
        assert_eq!(apply_transaction(10, TxnType::In, 5).unwrap(), 15);
    }

    #[test]
    fn out_subtracts_from_balance() {
        assert_eq!(apply_transaction(10, TxnType::Out, 10).unwrap(), 0);
    }

    #[test]
    fn out_beyond_balance_is_insufficient_stock() {
        let err = apply_transaction(3, TxnType::Out, 4).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref m) if m.contains("Insufficient stock")));
    }

    #[test]
    fn adjust_sets_absolute_balance() {
        assert_eq!(apply_transaction(42, TxnType::Adjust, 7).unwrap(), 7);
        assert_eq!(apply_transaction(42, TxnType::Adjust, 0).unwrap(), 0);
        assert!(apply_transaction(42, TxnType::Adjust, -1).is_err());
    }

    #[test]
    fn zero_quantity_movement_rejected() {
        assert!(apply_transaction(5, TxnType::In, 0).is_err());
        assert!(apply_transaction(5, TxnType::Out, 0).is_err());
    }

    #[test]
    fn low_stock_crossing_only_fires_once() {
        assert!(crossed_low_stock(12, 10, 10));
        assert!(!crossed_low_stock(10, 8, 10));
        assert!(!crossed_low_stock(20, 15, 10));
    }

    #[test]
    fn sku_character_set() {
        assert!(validate_sku("GLV-NIT-M").is_ok());
        assert!(validate_sku("bad sku").is_err());
        assert!(validate_sku("").is_err());
    }
}
