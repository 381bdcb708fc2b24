use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::aggregator::fetcher::PageSource;
use crate::aggregator::models::ExchangeRate;

// KZT entry in the CBR daily feed.
static VALUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<Valute ID="R01335">(.*?)</Valute>"#).unwrap());
static NOMINAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<Nominal>([^<]+)</Nominal>").unwrap());
static VALUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<Value>([^<]+)</Value>").unwrap());

/// Resolves the ruble-to-tenge multiplier from the daily feed.
///
/// Best effort with a safe default: any failure (feed unreachable,
/// malformed body, missing currency entry) yields `fallback`, never an
/// error. The multiplier is always positive.
pub async fn resolve_rate(
    fetcher: &dyn PageSource,
    feed_url: &str,
    fallback: f64,
) -> ExchangeRate {
    let body = match fetcher.fetch_html(feed_url).await {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "Rate feed unreachable, using fallback rate");
            return ExchangeRate::new(fallback);
        }
    };

    match parse_rate(&body) {
        Some(multiplier) => {
            debug!(multiplier, "Resolved exchange rate");
            ExchangeRate::new(multiplier)
        }
        None => {
            warn!("Rate feed had no usable currency entry, using fallback rate");
            ExchangeRate::new(fallback)
        }
    }
}

/// Extracts `nominal / value` for the target currency entry.
/// Returns `None` unless the result is a positive finite number.
pub fn parse_rate(feed: &str) -> Option<f64> {
    let block = VALUTE_RE.captures(feed)?.get(1)?.as_str();

    let nominal: f64 = NOMINAL_RE
        .captures(block)?
        .get(1)?
        .as_str()
        .trim()
        .parse()
        .ok()?;

    // The feed uses a comma decimal separator.
    let value: f64 = VALUE_RE
        .captures(block)?
        .get(1)?
        .as_str()
        .trim()
        .replace(',', ".")
        .parse()
        .ok()?;

    if value > 0.0 && nominal > 0.0 {
        let multiplier = nominal / value;
        multiplier.is_finite().then_some(multiplier)
    } else {
        None
    }
}
