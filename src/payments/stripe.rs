use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{AppError, Result};
use crate::models::{OrderItem, ShippingAddress};
use crate::payments::CheckoutSession;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Replay window for webhook signatures, matching the provider's
/// recommended tolerance.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// One line of a checkout session as we submit it. Amounts are integer
/// cents, already discounted.
#[derive(Debug, Clone)]
pub struct CheckoutLineItem {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: i64,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListLineItemsResponse {
    data: Vec<ProviderLineItem>,
}

/// A line item as the provider reports it back for a completed
/// session. This, not the client cart, is what orders are built from.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderLineItem {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub amount_total: i64,
}

impl ProviderLineItem {
    /// Translates the provider's shape into ours. The per-unit price is
    /// the line total floor-divided by quantity, mirroring how the
    /// session was priced in the first place.
    pub fn to_order_item(&self) -> OrderItem {
        let quantity = self.quantity.unwrap_or(1).max(1);
        OrderItem {
            name: self.description.clone().unwrap_or_default(),
            quantity,
            price_cents: self.amount_total / quantity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self::with_base(secret_key, STRIPE_API_BASE)
    }

    /// Points the client at a different API host. Used to run against
    /// a local stand-in server.
    pub fn with_base(secret_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key: secret_key.into(),
            api_base: api_base.into(),
        }
    }

    /// Creates a hosted checkout session in payment mode and returns
    /// its id plus the URL to redirect the customer to.
    pub async fn create_checkout_session(
        &self,
        line_items: &[CheckoutLineItem],
        success_url: &str,
        cancel_url: &str,
        promo_code: Option<&str>,
    ) -> Result<CheckoutSession> {
        let form = session_form(line_items, success_url, cancel_url, promo_code);
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Stripe session creation failed ({status}): {body}"
            )));
        }

        let session: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid Stripe response: {e}")))?;
        let url = session
            .url
            .ok_or_else(|| AppError::Upstream("Stripe session has no redirect URL".into()))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    /// Fetches the authoritative line items for a completed session.
    pub async fn list_line_items(&self, session_id: &str) -> Result<Vec<ProviderLineItem>> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{session_id}/line_items",
                self.api_base
            ))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Stripe line-item listing failed ({status}): {body}"
            )));
        }

        let listing: ListLineItemsResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid Stripe response: {e}")))?;
        Ok(listing.data)
    }
}

/// Builds the form-encoded body for session creation. The provider
/// takes nested fields as bracketed keys on a flat form.
fn session_form(
    line_items: &[CheckoutLineItem],
    success_url: &str,
    cancel_url: &str,
    promo_code: Option<&str>,
) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
        (
            "metadata[promo_code]".to_string(),
            promo_code.unwrap_or("none").to_string(),
        ),
    ];
    for (i, item) in line_items.iter().enumerate() {
        form.push((
            format!("line_items[{i}][price_data][currency]"),
            "eur".to_string(),
        ));
        form.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.name.clone(),
        ));
        if let Some(image) = &item.image {
            form.push((
                format!("line_items[{i}][price_data][product_data][images][0]"),
                image.clone(),
            ));
        }
        form.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            item.unit_amount.to_string(),
        ));
        form.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
    }
    form
}

/// Why a webhook signature was refused. `Malformed` is the caller's
/// request being unreadable; the other two mean the payload must not
/// be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Expired,
    #[error("signature mismatch")]
    Mismatch,
}

/// Verifies `stripe-signature` headers against the shared webhook
/// secret. The header carries a unix timestamp and an HMAC-SHA256 of
/// `"{timestamp}.{raw body}"` in hex.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn verify(&self, payload: &[u8], sig_header: &str) -> Result<(), SignatureError> {
        self.verify_at(payload, sig_header, chrono::Utc::now().timestamp())
    }

    fn verify_at(&self, payload: &[u8], sig_header: &str, now: i64) -> Result<(), SignatureError> {
        let mut timestamp = "";
        let mut signatures = Vec::new();
        for part in sig_header.split(',') {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = t;
            } else if let Some(v) = part.strip_prefix("v1=") {
                signatures.push(v);
            }
        }
        if timestamp.is_empty() || signatures.is_empty() {
            return Err(SignatureError::Malformed);
        }
        let ts: i64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;
        let decoded: Vec<Vec<u8>> = signatures
            .iter()
            .map(|s| hex::decode(s))
            .collect::<Result<_, _>>()
            .map_err(|_| SignatureError::Malformed)?;

        if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(SignatureError::Expired);
        }

        // During secret rotation the header carries one v1 entry per
        // active secret; any match accepts.
        for candidate in &decoded {
            let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
                .map_err(|_| SignatureError::Malformed)?;
            mac.update(timestamp.as_bytes());
            mac.update(b".");
            mac.update(payload);
            // verify_slice compares in constant time.
            if mac.verify_slice(candidate).is_ok() {
                return Ok(());
            }
        }
        Err(SignatureError::Mismatch)
    }
}

/// The event envelope. `data.object` stays raw JSON until the event
/// type says what shape it holds; most event types are acknowledged
/// without ever deserializing it.
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct SessionObject {
    pub id: String,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub shipping_details: Option<ShippingDetailsWire>,
    #[serde(default)]
    pub metadata: Option<SessionMetadata>,
}

impl SessionObject {
    /// The contact address for the purchase, wherever the provider put
    /// it. Older API versions carried it on the session itself.
    pub fn email(&self) -> Option<&str> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.as_deref())
            .or(self.customer_email.as_deref())
            .filter(|e| !e.is_empty())
    }

    /// Display name for the order, falling back to the shipping name
    /// and finally the email address.
    pub fn customer_name(&self) -> String {
        self.customer_details
            .as_ref()
            .and_then(|d| d.name.clone())
            .or_else(|| {
                self.shipping_details
                    .as_ref()
                    .and_then(|s| s.name.clone())
            })
            .or_else(|| self.email().map(str::to_string))
            .unwrap_or_default()
    }

    /// The promo code recorded at session creation. Missing metadata,
    /// an explicit null, and the `"none"` sentinel all mean no code.
    pub fn promo_code(&self) -> Option<&str> {
        self.metadata
            .as_ref()?
            .promo_code
            .as_deref()
            .filter(|code| !code.is_empty() && *code != "none")
    }

    pub fn shipping_address(&self) -> Option<ShippingAddress> {
        self.shipping_details.as_ref().map(|s| {
            let address = s.address.clone().unwrap_or_default();
            ShippingAddress {
                name: s.name.clone(),
                line1: address.line1,
                line2: address.line2,
                city: address.city,
                postal_code: address.postal_code,
                country: address.country,
            }
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ShippingDetailsWire {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<AddressWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressWire {
    #[serde(default)]
    pub line1: Option<String>,
    #[serde(default)]
    pub line2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionMetadata {
    #[serde(default)]
    pub promo_code: Option<String>,
}
