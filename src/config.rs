use std::env;

use url::Url;

/// How incoming payment webhooks are authenticated. Selected once at startup
/// and logged; production never falls back to the unverified branch.
#[derive(Debug, Clone)]
pub enum WebhookMode {
    /// Signatures are verified against the configured signing secret.
    Verified(String),
    /// Dev profile only: events are parsed without verification.
    DevUnverified,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub dev_mode: bool,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub admin_secret: Option<String>,
    pub allowed_origins: AllowedOrigins,
    pub notify_webhook_url: Option<String>,
    /// Checkout-session requests allowed per client IP per minute.
    pub checkout_rate_limit: u32,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("RUSTIKOP_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let checkout_rate_limit: u32 = env::var("CHECKOUT_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let allowed_origins = AllowedOrigins::from_env_list(
            env::var("ALLOWED_ORIGINS").ok().as_deref().unwrap_or(""),
            dev_mode,
        );

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "rustikop.db".to_string()),
            dev_mode,
            stripe_secret_key: non_empty(env::var("STRIPE_SECRET_KEY").ok()),
            stripe_webhook_secret: non_empty(env::var("STRIPE_WEBHOOK_SECRET").ok()),
            admin_secret: non_empty(env::var("ADMIN_SECRET").ok()),
            allowed_origins,
            notify_webhook_url: non_empty(env::var("NOTIFY_WEBHOOK_URL").ok()),
            checkout_rate_limit,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Webhook authentication mode, or `None` when the endpoint must degrade
    /// (production profile with no signing secret configured).
    pub fn webhook_mode(&self) -> Option<WebhookMode> {
        match &self.stripe_webhook_secret {
            Some(secret) => Some(WebhookMode::Verified(secret.clone())),
            None if self.dev_mode => Some(WebhookMode::DevUnverified),
            None => None,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Origins permitted as CORS callers and as checkout redirect targets.
///
/// The configured list is matched by serialized origin (scheme + host + port).
/// `.vercel.app` hosts are always allowed (preview deployments); localhost and
/// private IPv4 ranges are allowed in the dev profile only.
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    origins: Vec<String>,
    dev_extras: bool,
}

impl AllowedOrigins {
    pub fn from_env_list(raw: &str, dev_mode: bool) -> Self {
        let origins = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| match Url::parse(s) {
                Ok(url) => Some(url.origin().ascii_serialization()),
                Err(e) => {
                    tracing::warn!(origin = %s, error = %e, "Ignoring unparseable allowed origin");
                    None
                }
            })
            .collect();
        Self {
            origins,
            dev_extras: dev_mode,
        }
    }

    pub fn allows_url(&self, url: &Url) -> bool {
        if !matches!(url.scheme(), "http" | "https") {
            return false;
        }
        if self
            .origins
            .iter()
            .any(|o| *o == url.origin().ascii_serialization())
        {
            return true;
        }

        let host = url.host_str().unwrap_or_default();
        if host.ends_with(".vercel.app") {
            return true;
        }

        if self.dev_extras {
            if host == "localhost" || host == "127.0.0.1" || host == "[::1]" {
                return true;
            }
            if let Some(url::Host::Ipv4(ip)) = url.host() {
                return ip.is_private();
            }
        }

        false
    }

    /// For `Origin` header values, which are serialized origins and therefore
    /// themselves parseable as URLs.
    pub fn allows_origin_str(&self, origin: &str) -> bool {
        match Url::parse(origin) {
            Ok(url) => self.allows_url(&url),
            Err(_) => false,
        }
    }
}
