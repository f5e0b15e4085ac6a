pub mod from_row;
pub mod queries;

use std::sync::Arc;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::config::{AllowedOrigins, Config, WebhookMode};
use crate::error::Result;
use crate::notify::Notifier;
use crate::payments::StripeClient;
use crate::rate_limit::{InMemoryRateLimiter, RateLimiter};

pub type DbPool = r2d2::Pool<SqliteConnectionManager>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    customer_name TEXT NOT NULL,
    email TEXT NOT NULL,
    total_cents INTEGER NOT NULL,
    status TEXT NOT NULL,
    items TEXT NOT NULL,
    date INTEGER NOT NULL,
    payment_ref TEXT UNIQUE,
    shipping_address TEXT,
    checklist TEXT NOT NULL,
    notes TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_date ON orders(date DESC);

CREATE TABLE IF NOT EXISTS promotions (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE COLLATE NOCASE,
    type TEXT NOT NULL,
    value REAL NOT NULL,
    uses_count INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);
";

/// Everything handlers need, shared across requests. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// `None` when no provider key is configured; checkout degrades to 500.
    pub stripe: Option<StripeClient>,
    /// `None` when the production profile has no signing secret; the
    /// webhook endpoint degrades to 500.
    pub webhook_mode: Option<WebhookMode>,
    pub notifier: Notifier,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub admin_secret: Option<String>,
    pub allowed_origins: AllowedOrigins,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let db = create_pool(&config.database_path)?;
        {
            let conn = db.get()?;
            init_schema(&conn)?;
        }
        Ok(Self {
            db,
            stripe: config
                .stripe_secret_key
                .as_ref()
                .map(|key| StripeClient::new(key.clone())),
            webhook_mode: config.webhook_mode(),
            notifier: Notifier::new(config.notify_webhook_url.clone()),
            rate_limiter: Arc::new(InMemoryRateLimiter::new(config.checkout_rate_limit)),
            admin_secret: config.admin_secret.clone(),
            allowed_origins: config.allowed_origins.clone(),
        })
    }
}

pub fn create_pool(path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|conn| conn.pragma_update(None, "journal_mode", "WAL"));
    Ok(r2d2::Pool::new(manager)?)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
