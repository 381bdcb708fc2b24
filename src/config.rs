use std::env;

#[derive(Clone)]
pub struct Config {
    pub base_url: String,
    pub rate_feed_url: String,
    pub per_source_cap: usize,
    pub source_limit: usize,
    pub catalog_limit: usize,
    pub request_timeout_secs: u64,
    pub fallback_rate: f64,
    pub discover_sources: bool,
    pub models_per_brand: usize,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            base_url: var_or("MOTOBAY_BASE_URL", "https://motobay.su"),
            rate_feed_url: var_or("RATE_FEED_URL", "https://www.cbr.ru/scripts/XML_daily.asp"),
            per_source_cap: var_or("PER_SOURCE_CAP", "3").parse()?,
            source_limit: var_or("SOURCE_LIMIT", "8").parse()?,
            // 0 means the published catalog is not truncated
            catalog_limit: var_or("CATALOG_LIMIT", "0").parse()?,
            request_timeout_secs: var_or("REQUEST_TIMEOUT_SECS", "30").parse()?,
            fallback_rate: var_or("FALLBACK_RATE", "5.0").parse()?,
            discover_sources: var_or("DISCOVER_SOURCES", "false").parse()?,
            models_per_brand: var_or("MODELS_PER_BRAND", "10").parse()?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://motobay.su".to_string(),
            rate_feed_url: "https://www.cbr.ru/scripts/XML_daily.asp".to_string(),
            per_source_cap: 3,
            source_limit: 8,
            catalog_limit: 0,
            request_timeout_secs: 30,
            fallback_rate: 5.0,
            discover_sources: false,
            models_per_brand: 10,
        }
    }
}
