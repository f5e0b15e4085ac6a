use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Lifecycle of a studio order. `Paid` is the only status the payment
/// webhook ever writes; the rest are set by hand from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Received,
    Paid,
    InProgress,
    Done,
}

/// One purchased line as recorded on the order. Prices are integer cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: i64,
    pub price_cents: i64,
}

/// A single production-tracking step shown to the customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistStep {
    pub label: String,
    pub completed: bool,
}

/// The fulfillment checklist every new order starts with. All steps
/// begin unchecked; the studio ticks them off from the dashboard.
pub fn default_checklist() -> Vec<ChecklistStep> {
    ["Brief received", "Concept validated", "Production", "Shipped"]
        .into_iter()
        .map(|label| ChecklistStep {
            label: label.to_string(),
            completed: false,
        })
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub name: Option<String>,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub email: String,
    /// Amount actually collected, in cents.
    pub total_cents: i64,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    /// Purchase date as a unix timestamp.
    pub date: i64,
    /// Provider checkout session id for webhook-created orders,
    /// `None` for orders entered by hand.
    pub payment_ref: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub checklist: Vec<ChecklistStep>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Everything needed to insert an order row. Shared by the webhook
/// processor and the dashboard's manual-entry endpoint.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_name: String,
    pub email: String,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub date: i64,
    pub payment_ref: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub checklist: Vec<ChecklistStep>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub name: String,
    pub quantity: i64,
    /// Unit price in major units, e.g. `12.5` for €12.50.
    pub price: f64,
}

/// Body of `POST /orders` (manual entry from the dashboard).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_name: String,
    pub email: String,
    #[serde(default)]
    pub items: Vec<OrderItemRequest>,
    pub total: f64,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `PUT /orders/{id}`. Absent fields are left untouched.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub status: Option<OrderStatus>,
    #[serde(default)]
    pub checklist: Option<Vec<ChecklistStep>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub name: String,
    pub quantity: i64,
    pub price: f64,
}

/// Wire view of an order. Money goes out in major units; everything the
/// dashboard renders is carried here so it never touches rows directly.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    pub customer_name: String,
    pub email: String,
    pub total: f64,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub date: i64,
    pub payment_ref: Option<String>,
    pub shipping_address: Option<ShippingAddress>,
    pub checklist: Vec<ChecklistStep>,
    pub notes: Option<String>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        OrderResponse {
            id: order.id,
            customer_name: order.customer_name,
            email: order.email,
            total: order.total_cents as f64 / 100.0,
            status: order.status,
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemResponse {
                    name: item.name,
                    quantity: item.quantity,
                    price: item.price_cents as f64 / 100.0,
                })
                .collect(),
            date: order.date,
            payment_ref: order.payment_ref,
            shipping_address: order.shipping_address,
            checklist: order.checklist,
            notes: order.notes,
        }
    }
}
