//! Money math for the checkout flow.
//!
//! Everything here works in integer cents. Client prices arrive as
//! floats in major units and are converted exactly once, at the edge,
//! with [`to_cents`]. The discount distribution reproduces what the
//! storefront has always charged: the discount is eaten line by line
//! in cart order, and each discounted line total is divided by its
//! quantity with *floor* division to produce a per-unit amount. The
//! sub-cent remainder of that division is dropped, so a discounted
//! charge can come out a few cents below `subtotal - discount`.
//! Do not "fix" this without migrating historical order totals.

use crate::models::PromoKind;

/// Converts a major-unit price to cents, rounding to the nearest cent.
pub fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// One cart line after conversion to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentLine {
    pub unit_cents: i64,
    pub quantity: i64,
}

impl CentLine {
    pub fn total(&self) -> i64 {
        self.unit_cents * self.quantity
    }
}

pub fn subtotal_cents(lines: &[CentLine]) -> i64 {
    lines.iter().map(CentLine::total).sum()
}

/// Computes the discount in cents for a promotion applied to the given
/// subtotal. Percent promotions round to the nearest cent; fixed
/// promotions convert their value to cents. The result is clamped to
/// `0..=subtotal` so a charge can never go negative.
pub fn discount_cents(kind: PromoKind, value: f64, subtotal: i64) -> i64 {
    let raw = match kind {
        PromoKind::Percent => (subtotal as f64 * value / 100.0).round() as i64,
        PromoKind::Fixed => to_cents(value),
    };
    raw.clamp(0, subtotal)
}

/// Spreads `discount` across `lines` in order and returns the final
/// per-unit amount for each line.
///
/// Each line absorbs as much of the remaining discount as its own
/// total covers; later lines only see what is left. The discounted
/// line total is then floor-divided by the quantity, which silently
/// drops up to `quantity - 1` cents per line.
///
/// Lines must have `quantity >= 1`; callers validate this before
/// converting to cents.
pub fn distribute_discount(lines: &[CentLine], discount: i64) -> Vec<i64> {
    let mut remaining = discount;
    lines
        .iter()
        .map(|line| {
            let total = line.total();
            let deduction = remaining.min(total);
            remaining -= deduction;
            (total - deduction) / line.quantity
        })
        .collect()
}
