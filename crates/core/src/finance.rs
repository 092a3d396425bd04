//! Cost/revenue aggregation.
//!
//! Amounts are integer cents; percentages are rounded to two decimals.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::CoreError;

/// `part / whole * 100` rounded to two decimals; `0.0` when `whole` is zero.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Largest single cost or revenue entry, in cents (1 billion currency units).
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

pub fn validate_amount(amount_cents: i64) -> Result<(), CoreError> {
    if amount_cents <= 0 {
        return Err(CoreError::Validation(
            "Amount must be greater than zero".into(),
        ));
    }
    if amount_cents > MAX_AMOUNT_CENTS {
        return Err(CoreError::Validation(format!(
            "Amount must not exceed {MAX_AMOUNT_CENTS} cents"
        )));
    }
    Ok(())
}

fn too_large() -> CoreError {
    CoreError::Validation("Totals for this range are too large to compute".into())
}

/// One row of a category/source breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownLine {
    pub key: String,
    pub amount_cents: i64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinanceSummary {
    pub total_cost_cents: i64,
    pub total_revenue_cents: i64,
    pub net_cents: i64,
    pub margin_pct: f64,
    pub cost_by_category: Vec<BreakdownLine>,
    pub revenue_by_source: Vec<BreakdownLine>,
}

fn breakdown(entries: &[(String, i64)]) -> Result<(i64, Vec<BreakdownLine>), CoreError> {
    let mut grouped: BTreeMap<&str, i64> = BTreeMap::new();
    let mut total = 0i64;
    for (key, amount) in entries {
        let slot = grouped.entry(key.as_str()).or_default();
        *slot = slot.checked_add(*amount).ok_or_else(too_large)?;
        total = total.checked_add(*amount).ok_or_else(too_large)?;
    }
    let mut lines: Vec<BreakdownLine> = grouped
        .into_iter()
        .map(|(key, amount_cents)| BreakdownLine {
            key: key.to_string(),
            amount_cents,
            share_pct: percentage(amount_cents, total),
        })
        .collect();
    // Largest first, ties by key.
    lines.sort_by(|a, b| b.amount_cents.cmp(&a.amount_cents).then(a.key.cmp(&b.key)));
    Ok((total, lines))
}

/// Summarize `(category, amount)` costs and `(source, amount)` revenues.
/// Entries with the same key may appear more than once.
pub fn summarize(
    costs: &[(String, i64)],
    revenues: &[(String, i64)],
) -> Result<FinanceSummary, CoreError> {
    let (total_cost_cents, cost_by_category) = breakdown(costs)?;
    let (total_revenue_cents, revenue_by_source) = breakdown(revenues)?;
    let net_cents = total_revenue_cents
        .checked_sub(total_cost_cents)
        .ok_or_else(too_large)?;
    Ok(FinanceSummary {
        total_cost_cents,
        total_revenue_cents,
        net_cents,
        margin_pct: percentage(net_cents, total_revenue_cents),
        cost_by_category,
        revenue_by_source,
    })
}
