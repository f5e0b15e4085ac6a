mod stripe;

pub use stripe::*;

use serde::{Deserialize, Serialize};

/// What the provider hands back when a checkout session is created.
/// The id doubles as the order's payment reference once the webhook
/// confirms payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}
