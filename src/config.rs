use std::env;

use anyhow::Context;

use crate::models::ShopHours;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub shop: ShopHours,
    /// Extra attempts for a write transaction that hits a locked database.
    pub tx_retries: u32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let shop = ShopHours::parse(
            &var_or("SHOP_OPEN", "09:00"),
            &var_or("SHOP_CLOSE", "17:00"),
            &var_or("SHOP_CLOSED_DAYS", "sun"),
            &var_or("SHOP_UTC_OFFSET", "+00:00"),
            parsed_or("SLOT_STEP_MINUTES", 15)?,
            parsed_or("LOOKAHEAD_DAYS", 30)?,
        )
        .context("invalid shop hours configuration")?;

        Ok(Self {
            port: parsed_or("PORT", 3000)?,
            database_url: var_or("DATABASE_URL", "servicebay.db"),
            shop,
            tx_retries: parsed_or("TX_RETRIES", 5)?,
        })
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "servicebay.db".to_string(),
            shop: ShopHours::default(),
            tx_retries: 5,
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}
