use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// How a promotion's `value` is interpreted: a percentage of the cart
/// subtotal, or a fixed amount in major units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PromoKind {
    Percent,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    /// Matched case-insensitively against what the customer types.
    pub code: String,
    #[serde(rename = "type")]
    pub kind: PromoKind,
    pub value: f64,
    /// Incremented once per paid order that redeemed the code.
    pub uses_count: i64,
    pub created_at: i64,
}

/// Body of `POST /promotions`.
#[derive(Debug, Deserialize)]
pub struct CreatePromotion {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: PromoKind,
    pub value: f64,
}
