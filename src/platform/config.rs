use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub payments: PaymentsConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// A login that exists only in configuration, never in the `users` table.
#[derive(Debug, Clone)]
pub struct BuiltinAccount {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub admin: BuiltinAccount,
    pub owner: BuiltinAccount,
}

#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    /// Gateway secret key. `None` puts payments in demo mode.
    pub gateway_secret_key: Option<String>,
    pub currency: String,
    pub api_base: String,
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{} must be set", key))
}

fn or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Reads the configuration from the process environment.
pub fn load() -> Result<AppConfig> {
    let port = or_default("PORT", "5000")
        .parse()
        .context("PORT must be a valid port number")?;

    let token_ttl_hours = or_default("TOKEN_TTL_HOURS", "24")
        .parse()
        .context("TOKEN_TTL_HOURS must be a whole number of hours")?;

    let gateway_secret_key = std::env::var("STRIPE_SECRET_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());

    let config = AppConfig {
        server: ServerConfig { port },
        database: DatabaseConfig {
            url: required("DATABASE_URL")?,
        },
        auth: AuthConfig {
            jwt_secret: required("JWT_SECRET")?,
            token_ttl_hours,
            admin: BuiltinAccount {
                email: or_default("ADMIN_EMAIL", "admin@gmail.com"),
                password: or_default("ADMIN_PASSWORD", "123"),
            },
            owner: BuiltinAccount {
                email: or_default("OWNER_EMAIL", "owner@gmail.com"),
                password: or_default("OWNER_PASSWORD", "123"),
            },
        },
        payments: PaymentsConfig {
            gateway_secret_key,
            currency: or_default("PAYMENT_CURRENCY", "usd"),
            api_base: or_default("PAYMENT_API_BASE", "https://api.stripe.com"),
        },
    };

    tracing::info!(
        port = config.server.port,
        demo_payments = config.payments.gateway_secret_key.is_none(),
        "Config loaded"
    );

    Ok(config)
}
