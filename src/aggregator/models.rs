use chrono::{DateTime, Utc};
use serde::Serialize;

/// One auctioned vehicle row extracted from a listing-table page.
///
/// `id` and `title` are always present (the title falls back to a
/// placeholder); every other field is filled only when its pattern
/// matched on the row.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub id: u64,
    pub title: String,
    /// Price in source currency (rubles), 0 when no price matched.
    pub price_local: i64,
    /// Price converted with the pass multiplier, rounded.
    pub price_converted: i64,
    pub image_url: String,
    pub lot_number: Option<String>,
    pub auction_house: Option<String>,
    pub listed_date: Option<String>,
    pub year: Option<String>,
    pub engine_displacement: Option<String>,
    pub frame_code: Option<String>,
    pub mileage: Option<String>,
    pub rating: Option<String>,
    pub start_price: Option<String>,
    pub status: Option<String>,
}

/// Conversion multiplier resolved once per aggregation pass.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExchangeRate {
    pub multiplier: f64,
    pub resolved_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(multiplier: f64) -> Self {
        Self {
            multiplier,
            resolved_at: Utc::now(),
        }
    }
}
