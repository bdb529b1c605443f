//! Order number generation and totals computation.

use chrono::{Datelike, Utc};
use rand::Rng;

use super::{OrderLine, OrderSummary};

/// UK VAT rate applied to every order subtotal.
pub const VAT_RATE: f64 = 0.20;

/// Rounds a monetary value to 2 decimal places.
pub fn round_to_pence(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Generates a human-readable order number: `SSS` + 2-digit year + 2-digit
/// month + 2-digit day + 3-digit random suffix.
///
/// Known limitation: the 3-digit suffix makes same-day collisions possible
/// and uniqueness is only enforced by the store's unique index, not by a
/// retry loop here.
pub fn generate_order_number() -> String {
    let date = Utc::now();
    let suffix: u32 = rand::rng().random_range(0..1000);
    format!(
        "SSS{:02}{:02}{:02}{:03}",
        date.year() % 100,
        date.month(),
        date.day(),
        suffix
    )
}

/// Computes order totals from the line items.
///
/// Pure: subtotal = Σ(price × quantity), vat = subtotal × 0.20,
/// total = subtotal + vat, each rounded to 2 decimal places independently.
/// Currency is fixed to GBP.
pub fn compute_totals(lines: &[OrderLine]) -> OrderSummary {
    let raw_subtotal: f64 = lines
        .iter()
        .map(|l| l.price * f64::from(l.quantity))
        .sum();
    let subtotal = round_to_pence(raw_subtotal);
    let vat = round_to_pence(subtotal * VAT_RATE);
    let total = round_to_pence(subtotal + vat);

    OrderSummary {
        subtotal,
        vat,
        total,
        currency: "GBP".to_string(),
    }
}
