//! In-process cart state for storefront clients.
//!
//! This is the typed counterpart of what the browser keeps in local
//! storage: an ordered list of lines plus at most one applied
//! promotion. Totals computed here are advisory. The server recomputes
//! every amount from the wire items when a checkout session is created,
//! so nothing in this module is trusted for billing.

use serde::{Deserialize, Serialize};

use crate::models::Promotion;
use crate::pricing::{self, CentLine};

/// A catalog entry as the cart needs to see it. `promo_price` is a
/// sale price maintained alongside the regular one; the cheaper of the
/// two wins when the item is added.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    pub base_price: f64,
    #[serde(default)]
    pub promo_price: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
}

/// One variant choice made by the customer, with the price difference
/// it carries (can be negative).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub price_delta: f64,
}

/// A line in the cart. `unit_cents` is fixed when the line is created
/// and never recomputed from the option list afterwards.
#[derive(Debug, Clone)]
pub struct CartLine {
    product_id: String,
    option_key: String,
    pub name: String,
    pub unit_cents: i64,
    pub quantity: i64,
    pub image: Option<String>,
    pub options: Vec<SelectedOption>,
}

/// What one cart line looks like in the `POST /checkout-session` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemWire {
    pub name: String,
    /// Unit price in major units.
    pub price: f64,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Canonical serialization of an option set. Sorted, so two carts that
/// picked the same options in a different order merge into one line.
fn option_key(options: &[SelectedOption]) -> String {
    let mut pairs: Vec<String> = options
        .iter()
        .map(|opt| format!("{}={}", opt.name, opt.value))
        .collect();
    pairs.sort();
    pairs.join(";")
}

#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: Vec<CartLine>,
    promotion: Option<Promotion>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn promotion(&self) -> Option<&Promotion> {
        self.promotion.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds `quantity` of a product with the given option choices. A
    /// line with the same product and the same option set (in any
    /// order) has its quantity bumped instead of a new line appended.
    pub fn add_item(&mut self, product: &CatalogProduct, options: &[SelectedOption], quantity: i64) {
        if quantity <= 0 {
            return;
        }
        let key = option_key(options);
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.id && line.option_key == key)
        {
            line.quantity += quantity;
            return;
        }
        let base = match product.promo_price {
            Some(promo) if promo < product.base_price => promo,
            _ => product.base_price,
        };
        let unit = base + options.iter().map(|opt| opt.price_delta).sum::<f64>();
        self.lines.push(CartLine {
            product_id: product.id.clone(),
            option_key: key,
            name: product.name.clone(),
            unit_cents: pricing::to_cents(unit),
            quantity,
            image: product.image.clone(),
            options: options.to_vec(),
        });
    }

    pub fn remove_item(&mut self, index: usize) {
        if index < self.lines.len() {
            self.lines.remove(index);
        }
    }

    /// Sets a line's quantity. Anything at or below zero removes the
    /// line rather than keeping a non-positive quantity around.
    pub fn update_quantity(&mut self, index: usize, quantity: i64) {
        if index >= self.lines.len() {
            return;
        }
        if quantity <= 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = quantity;
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.promotion = None;
    }

    /// Applies the promotion matching `code` (case-insensitive) from
    /// the given list. Returns false and changes nothing when the code
    /// is unknown; whether the code is still redeemable is the
    /// server's call at checkout time.
    pub fn apply_promotion(&mut self, code: &str, available: &[Promotion]) -> bool {
        match available
            .iter()
            .find(|promo| promo.code.eq_ignore_ascii_case(code))
        {
            Some(promo) => {
                self.promotion = Some(promo.clone());
                true
            }
            None => false,
        }
    }

    pub fn remove_promotion(&mut self) {
        self.promotion = None;
    }

    fn cent_lines(&self) -> Vec<CentLine> {
        self.lines
            .iter()
            .map(|line| CentLine {
                unit_cents: line.unit_cents,
                quantity: line.quantity,
            })
            .collect()
    }

    pub fn subtotal_cents(&self) -> i64 {
        pricing::subtotal_cents(&self.cent_lines())
    }

    /// Subtotal minus the applied promotion's discount, clamped so it
    /// never goes negative.
    pub fn total_cents(&self) -> i64 {
        let subtotal = self.subtotal_cents();
        let discount = match &self.promotion {
            Some(promo) => pricing::discount_cents(promo.kind, promo.value, subtotal),
            None => 0,
        };
        subtotal - discount
    }

    /// The cart as the checkout endpoint expects to receive it.
    pub fn wire_items(&self) -> Vec<CartItemWire> {
        self.lines
            .iter()
            .map(|line| CartItemWire {
                name: line.name.clone(),
                price: line.unit_cents as f64 / 100.0,
                quantity: line.quantity,
                image: line.image.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PromoKind;

    fn product(id: &str, name: &str, base: f64) -> CatalogProduct {
        CatalogProduct {
            id: id.to_string(),
            name: name.to_string(),
            base_price: base,
            promo_price: None,
            image: None,
        }
    }

    fn option(name: &str, value: &str, delta: f64) -> SelectedOption {
        SelectedOption {
            name: name.to_string(),
            value: value.to_string(),
            price_delta: delta,
        }
    }

    fn promo(code: &str, kind: PromoKind, value: f64) -> Promotion {
        Promotion {
            id: format!("promo_{code}"),
            code: code.to_string(),
            kind,
            value,
            uses_count: 0,
            created_at: 0,
        }
    }

    #[test]
    fn test_same_product_same_options_merges() {
        let mut cart = Cart::new();
        let shelf = product("p1", "Walnut shelf", 89.0);
        let opts = [option("finish", "oiled", 0.0), option("size", "60cm", 10.0)];
        let reversed = [option("size", "60cm", 10.0), option("finish", "oiled", 0.0)];
        cart.add_item(&shelf, &opts, 1);
        cart.add_item(&shelf, &reversed, 2);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.lines()[0].unit_cents, 9900);
    }

    #[test]
    fn test_different_options_stay_separate() {
        let mut cart = Cart::new();
        let shelf = product("p1", "Walnut shelf", 89.0);
        cart.add_item(&shelf, &[option("size", "60cm", 10.0)], 1);
        cart.add_item(&shelf, &[option("size", "90cm", 25.0)], 1);
        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.lines()[0].unit_cents, 9900);
        assert_eq!(cart.lines()[1].unit_cents, 11400);
    }

    #[test]
    fn test_promo_price_wins_when_lower() {
        let mut cart = Cart::new();
        let mut lamp = product("p2", "Cork lamp", 45.0);
        lamp.promo_price = Some(39.0);
        cart.add_item(&lamp, &[], 1);
        assert_eq!(cart.lines()[0].unit_cents, 3900);

        // A sale price above the base price is ignored.
        let mut cart = Cart::new();
        lamp.promo_price = Some(59.0);
        cart.add_item(&lamp, &[], 1);
        assert_eq!(cart.lines()[0].unit_cents, 4500);
    }

    #[test]
    fn test_quantity_zero_removes_line() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", "Poster", 20.0), &[], 2);
        cart.add_item(&product("p2", "Lamp", 45.0), &[], 1);
        cart.update_quantity(0, 0);
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].name, "Lamp");
        cart.update_quantity(0, -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_subtotal_and_total_with_promo() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", "Poster", 10.0), &[], 2);
        cart.add_item(&product("p2", "Lamp", 5.0), &[], 1);
        assert_eq!(cart.subtotal_cents(), 2500);

        let promos = [promo("WELCOME5", PromoKind::Fixed, 5.0)];
        assert!(cart.apply_promotion("welcome5", &promos));
        assert_eq!(cart.total_cents(), 2000);
    }

    #[test]
    fn test_unknown_code_is_a_noop() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", "Poster", 20.0), &[], 1);
        let promos = [promo("SUMMER10", PromoKind::Percent, 10.0)];
        assert!(!cart.apply_promotion("WINTER", &promos));
        assert!(cart.promotion().is_none());
        assert_eq!(cart.total_cents(), 2000);
    }

    #[test]
    fn test_total_never_negative() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", "Sticker", 3.0), &[], 1);
        let promos = [promo("BIG", PromoKind::Fixed, 50.0)];
        assert!(cart.apply_promotion("BIG", &promos));
        assert_eq!(cart.total_cents(), 0);
    }

    #[test]
    fn test_wire_items_round_to_major_units() {
        let mut cart = Cart::new();
        cart.add_item(&product("p1", "Poster", 12.5), &[option("frame", "oak", 7.25)], 2);
        let wire = cart.wire_items();
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].price, 19.75);
        assert_eq!(wire[0].quantity, 2);
    }
}
