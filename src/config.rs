use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram_token: String,
    pub telegram_api_base: String,

    pub store_backend: StoreBackend,
    pub mongodb_uri: String,
    pub mongodb_db: String,

    pub price_api_base: String,
    pub price_currency: String,
    // ticker => provider id, e.g. BTC => bitcoin
    pub price_assets: HashMap<String, String>,

    pub check_interval: Duration,
    pub quote_timeout: Duration,

    pub host: String,
    pub port: u16,
}

pub const DEFAULT_PRICE_ASSETS: &str = "BTC=bitcoin,ETH=ethereum,SOL=solana";

impl Settings {
    /// Defaults for everything except the transport token.
    pub fn with_token(telegram_token: impl Into<String>) -> Self {
        Self {
            telegram_token: telegram_token.into(),
            telegram_api_base: "https://api.telegram.org".to_string(),
            store_backend: StoreBackend::Mongo,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_db: "crypto_alerts".to_string(),
            price_api_base: "https://api.coingecko.com/api/v3".to_string(),
            price_currency: "usd".to_string(),
            price_assets: parse_asset_catalog(DEFAULT_PRICE_ASSETS),
            check_interval: Duration::from_secs(60),
            quote_timeout: Duration::from_secs(10),
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

pub fn load() -> Result<Settings, ConfigError> {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    from_lookup(|name| env::var(name).ok())
}

/// Builds settings from `lookup(var_name)`; `load` passes the process env.
pub fn from_lookup<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let token = lookup("TELEGRAM_APITOKEN").unwrap_or_default();
    if token.trim().is_empty() {
        return Err(ConfigError::MissingVar("TELEGRAM_APITOKEN"));
    }

    let mut settings = Settings::with_token(token.trim());

    if let Some(v) = lookup("TELEGRAM_API_BASE") {
        settings.telegram_api_base = v;
    }

    if let Some(v) = lookup("STORE_BACKEND") {
        settings.store_backend = match v.trim().to_lowercase().as_str() {
            "mongo" | "mongodb" => StoreBackend::Mongo,
            "memory" => StoreBackend::Memory,
            _ => {
                return Err(ConfigError::InvalidVar {
                    name: "STORE_BACKEND",
                    value: v,
                });
            }
        };
    }

    if let Some(v) = lookup("MONGODB_URI") {
        settings.mongodb_uri = v;
    }
    if let Some(v) = lookup("MONGODB_DB") {
        settings.mongodb_db = v;
    }

    if let Some(v) = lookup("PRICE_API_BASE") {
        settings.price_api_base = v;
    }
    if let Some(v) = lookup("PRICE_CURRENCY") {
        settings.price_currency = v.trim().to_lowercase();
    }
    if let Some(v) = lookup("PRICE_ASSETS") {
        let catalog = parse_asset_catalog(&v);
        if catalog.is_empty() {
            return Err(ConfigError::InvalidVar {
                name: "PRICE_ASSETS",
                value: v,
            });
        }
        settings.price_assets = catalog;
    }

    if let Some(secs) = parse_var::<u64, _>(&lookup, "ALERT_CHECK_INTERVAL_SECS")? {
        settings.check_interval = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = parse_var::<u64, _>(&lookup, "QUOTE_TIMEOUT_SECS")? {
        settings.quote_timeout = Duration::from_secs(secs.max(1));
    }

    if let Some(v) = lookup("HOST") {
        settings.host = v;
    }
    if let Some(port) = parse_var::<u16, _>(&lookup, "PORT")? {
        settings.port = port;
    }

    Ok(settings)
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value: v }),
        None => Ok(None),
    }
}

/// Parses `BTC=bitcoin,ETH=ethereum`. Malformed pairs are skipped.
pub fn parse_asset_catalog(raw: &str) -> HashMap<String, String> {
    raw.split(',')
        .filter_map(|pair| {
            let (ticker, id) = pair.split_once('=')?;
            let ticker = ticker.trim().to_uppercase();
            let id = id.trim().to_string();
            if ticker.is_empty() || id.is_empty() {
                return None;
            }
            Some((ticker, id))
        })
        .collect()
}
