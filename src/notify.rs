//! Operational notifications.
//!
//! Events are posted to a chat webhook URL when one is configured.
//! Delivery is best effort: every failure is logged and swallowed, and
//! callers only ever see a bool. Nothing in the order flow may depend
//! on a notification going out.

use reqwest::Client;
use serde::Serialize;

/// An event worth pinging the studio about, with the fields each kind
/// carries on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NotifyEvent {
    Order {
        customer_name: String,
        total: f64,
        items: usize,
    },
    User {
        email: String,
    },
    Review {
        author: String,
        rating: i64,
    },
    Contact {
        name: String,
        email: String,
        message: String,
    },
}

impl NotifyEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            NotifyEvent::Order { .. } => "order",
            NotifyEvent::User { .. } => "user",
            NotifyEvent::Review { .. } => "review",
            NotifyEvent::Contact { .. } => "contact",
        }
    }

    fn message(&self) -> String {
        match self {
            NotifyEvent::Order {
                customer_name,
                total,
                items,
            } => format!(
                "🛒 New order from {customer_name}: {total:.2}€ ({items} item{})",
                if *items == 1 { "" } else { "s" }
            ),
            NotifyEvent::User { email } => format!("👤 New account: {email}"),
            NotifyEvent::Review { author, rating } => {
                format!("⭐ New review from {author}: {rating}/5")
            }
            NotifyEvent::Contact {
                name,
                email,
                message,
            } => format!("✉️ Message from {name} <{email}>: {message}"),
        }
    }
}

/// Body shape the chat webhook expects.
#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    webhook_url: Option<String>,
    http_client: Client,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            http_client: Client::new(),
        }
    }

    /// Posts the event to the configured webhook. Returns whether the
    /// message was accepted; an unconfigured dispatcher reports false
    /// without doing anything.
    pub async fn notify(&self, event: &NotifyEvent) -> bool {
        let Some(url) = self.webhook_url.as_deref() else {
            tracing::debug!(kind = event.kind(), "No notification webhook configured");
            return false;
        };

        let content = event.message();
        let result = self
            .http_client
            .post(url)
            .json(&WebhookMessage { content: &content })
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(kind = event.kind(), "Notification sent");
                true
            }
            Ok(response) => {
                tracing::warn!(
                    kind = event.kind(),
                    status = %response.status(),
                    "Notification webhook returned error"
                );
                false
            }
            Err(e) => {
                tracing::warn!(kind = event.kind(), error = %e, "Notification webhook unreachable");
                false
            }
        }
    }
}
