//! Procurement: purchase request / order lifecycles and receipt arithmetic.

use crate::error::CoreError;

define_text_enum! {
    PurchaseRequestStatus("purchase request status") {
        Pending = "pending",
        Approved = "approved",
        Rejected = "rejected",
        Ordered = "ordered",
        Cancelled = "cancelled",
    }
}

define_text_enum! {
    PurchaseOrderStatus("purchase order status") {
        Issued = "issued",
        PartiallyReceived = "partially_received",
        Received = "received",
        Cancelled = "cancelled",
    }
}

impl PurchaseOrderStatus {
    /// Orders that can still accept goods receipts.
    pub fn accepts_receipts(self) -> bool {
        matches!(self, Self::Issued | Self::PartiallyReceived)
    }

    /// Only orders with nothing received yet can be cancelled.
    pub fn can_cancel(self) -> bool {
        self == Self::Issued
    }
}

/// Largest quantity a single request line may ask for.
pub const MAX_LINE_QUANTITY: i32 = 1_000_000;

/// Largest estimated unit cost, in cents (1 billion currency units).
pub const MAX_UNIT_COST_CENTS: i64 = 100_000_000_000;

/// Line estimate used when validating a purchase request.
#[derive(Debug, Clone, Copy)]
pub struct LineEstimate {
    pub quantity: i32,
    pub unit_cost_cents: i64,
}

/// Validate request lines: at least one, quantities in
/// `1..=MAX_LINE_QUANTITY`, costs in `0..=MAX_UNIT_COST_CENTS`, and a total
/// that fits in an `i64`.
pub fn validate_lines(lines: &[LineEstimate]) -> Result<(), CoreError> {
    if lines.is_empty() {
        return Err(CoreError::Validation(
            "A purchase request needs at least one line".into(),
        ));
    }
    for (i, l) in lines.iter().enumerate() {
        if !(1..=MAX_LINE_QUANTITY).contains(&l.quantity) {
            return Err(CoreError::Validation(format!(
                "Line {}: quantity must be between 1 and {MAX_LINE_QUANTITY}",
                i + 1
            )));
        }
        if !(0..=MAX_UNIT_COST_CENTS).contains(&l.unit_cost_cents) {
            return Err(CoreError::Validation(format!(
                "Line {}: unit cost must be between 0 and {MAX_UNIT_COST_CENTS} cents",
                i + 1
            )));
        }
    }
    total_cents(lines).map(|_| ())
}

/// Σ quantity × unit cost. Overflow is a validation error, not a panic.
pub fn total_cents(lines: &[LineEstimate]) -> Result<i64, CoreError> {
    lines.iter().try_fold(0i64, |acc, l| {
        i64::from(l.quantity)
            .checked_mul(l.unit_cost_cents)
            .and_then(|line_total| acc.checked_add(line_total))
            .ok_or_else(|| CoreError::Validation("Estimated total is too large".into()))
    })
}

/// `PO-YYYYMM-NNNN`, where `seq` is the 1-based order count in that month.
pub fn format_po_number(year: i32, month: u32, seq: i64) -> String {
    format!("PO-{year:04}{month:02}-{seq:04}")
}

/// Validate a receipt quantity against what remains outstanding on a line.
pub fn validate_receipt_quantity(
    ordered: i32,
    already_received: i32,
    quantity: i32,
) -> Result<(), CoreError> {
    if quantity <= 0 {
        return Err(CoreError::Validation(
            "Received quantity must be greater than zero".into(),
        ));
    }
    let remaining = ordered - already_received;
    if quantity > remaining {
        return Err(CoreError::Validation(format!(
            "Cannot receive {quantity}; only {remaining} outstanding on this line"
        )));
    }
    Ok(())
}

/// Order status implied by `(ordered, received)` per line.
pub fn status_after_receipt(lines: &[(i32, i32)]) -> PurchaseOrderStatus {
    let all = lines.iter().all(|(ordered, received)| received >= ordered);
    let any = lines.iter().any(|(_, received)| *received > 0);
    match (all, any) {
        (true, _) => PurchaseOrderStatus::Received,
        (false, true) => PurchaseOrderStatus::PartiallyReceived,
        (false, false) => PurchaseOrderStatus::Issued,
    }
}
