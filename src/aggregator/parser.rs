use once_cell::sync::Lazy;
use regex::Regex;

use crate::aggregator::models::Listing;

// One listing per table row carrying a data-id attribute.
static ROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<tr[^>]*data-id="(\d+)"[^>]*>(.*?)</tr>"#).unwrap());

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="make">([^<]+)</span>"#).unwrap());
static LOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="number">([^<]+)</span>"#).unwrap());
static AUCTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="area">([^<]+)</span>"#).unwrap());
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="date">([^<]+)</span>"#).unwrap());
static FRAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="chassis_n">([^<]+)</span>"#).unwrap());
static MILEAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"class="mileage">([^<]+)</td>"#).unwrap());
static RATING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"class="score">([^<]+)</td>"#).unwrap());
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<td>(\d{4})</td>").unwrap());
static DISPLACEMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<td>(\d{3,4})</td>").unwrap());
static STATUS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<td>(SOLD|Unsold|Available)</td>").unwrap());
static PRICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<span>([\d\s]+) р\.").unwrap());
static START_PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<span class="price-start">([\d\s]+ ¥)</span>"#).unwrap());
static IMG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<img[^>]+src="([^"]+)""#).unwrap());

pub const PLACEHOLDER_TITLE: &str = "Unknown Bike";

/// Extracts listings from a raw listing-table page, in document order.
///
/// The page shape is matched by text patterns only; a field whose
/// pattern does not hit is simply left unset. A row without a title
/// still yields a record with the placeholder title.
pub fn extract_listings(html: &str, multiplier: f64, base_url: &str) -> Vec<Listing> {
    let mut listings = Vec::new();

    for row in ROW_RE.captures_iter(html) {
        let id: u64 = row[1].parse().unwrap_or(0);
        let content = &row[2];

        let field = |re: &Regex| -> Option<String> {
            re.captures(content).map(|c| clean(&c[1]))
        };

        let title = field(&TITLE_RE).unwrap_or_else(|| PLACEHOLDER_TITLE.to_string());

        let year = YEAR_RE
            .captures(content)
            .map(|c| c[1].to_string());

        // A short digit-only cell counts as displacement only when it is
        // not the same text as the year cell. Page-shape dependent; pinned
        // by tests.
        let engine_displacement = DISPLACEMENT_RE
            .captures(content)
            .map(|c| c[1].to_string())
            .filter(|v| Some(v) != year.as_ref());

        let price_local = field(&PRICE_RE)
            .and_then(|p| parse_price(&p))
            .unwrap_or(0);
        let price_converted = (price_local as f64 * multiplier).round() as i64;

        let image_url = IMG_RE
            .captures(content)
            .map(|c| absolutize(base_url, &c[1]))
            .unwrap_or_default();

        listings.push(Listing {
            id,
            title,
            price_local,
            price_converted,
            image_url,
            lot_number: field(&LOT_RE),
            auction_house: field(&AUCTION_RE),
            listed_date: field(&DATE_RE),
            year,
            engine_displacement,
            frame_code: field(&FRAME_RE),
            mileage: field(&MILEAGE_RE),
            rating: field(&RATING_RE),
            start_price: field(&START_PRICE_RE),
            status: STATUS_RE.captures(content).map(|c| c[1].to_string()),
        });
    }

    listings
}

fn clean(raw: &str) -> String {
    raw.trim().replace("&#13;", "").replace("&nbsp;", " ")
}

/// Strips grouping spaces (plain and non-breaking) from a ruble amount.
fn parse_price(text: &str) -> Option<i64> {
    let digits: String = text.replace([' ', '\u{00A0}'], "");
    digits.parse().ok()
}

/// Rewrites a site-relative path against the source host; absolute URLs
/// pass through unchanged.
fn absolutize(base_url: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{base_url}{path}")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://motobay.su";

    fn row(id: u64, inner: &str) -> String {
        format!(r#"<tr class="lot" data-id="{id}">{inner}</tr>"#)
    }

    fn full_row() -> String {
        row(
            774411,
            r#"<td><img class="thumb" src="/photos/774411.jpg"></td>
<td><span class="make">HONDA CB400SF</span><span class="chassis_n">NC31-1234567</span></td>
<td><span class="number">70215</span><span class="area">USS Tokyo</span><span class="date">2025-12-14</span></td>
<td>399</td>
<td>1998</td>
<td class="mileage">23 456 km</td>
<td class="score">4.5</td>
<td><span>1 200 000 р.</span><span class="price-start">250 000 ¥</span></td>
<td>SOLD</td>"#,
        )
    }

    #[test]
    fn extracts_full_row() {
        let html = full_row();
        let listings = extract_listings(&html, 5.0, BASE);
        assert_eq!(listings.len(), 1);

        let l = &listings[0];
        assert_eq!(l.id, 774411);
        assert_eq!(l.title, "HONDA CB400SF");
        assert_eq!(l.lot_number.as_deref(), Some("70215"));
        assert_eq!(l.auction_house.as_deref(), Some("USS Tokyo"));
        assert_eq!(l.listed_date.as_deref(), Some("2025-12-14"));
        assert_eq!(l.year.as_deref(), Some("1998"));
        assert_eq!(l.engine_displacement.as_deref(), Some("399"));
        assert_eq!(l.frame_code.as_deref(), Some("NC31-1234567"));
        assert_eq!(l.mileage.as_deref(), Some("23 456 km"));
        assert_eq!(l.rating.as_deref(), Some("4.5"));
        assert_eq!(l.start_price.as_deref(), Some("250 000 ¥"));
        assert_eq!(l.status.as_deref(), Some("SOLD"));
        assert_eq!(l.image_url, "https://motobay.su/photos/774411.jpg");
    }

    #[test]
    fn price_with_grouping_spaces_parses_and_converts() {
        let html = full_row();
        let listings = extract_listings(&html, 5.0, BASE);
        assert_eq!(listings[0].price_local, 1_200_000);
        assert_eq!(listings[0].price_converted, 6_000_000);
    }

    #[test]
    fn price_with_nbsp_grouping_parses() {
        let html = row(1, "<td><span>1\u{00A0}200\u{00A0}000 р.</span></td>");
        let listings = extract_listings(&html, 1.0, BASE);
        assert_eq!(listings[0].price_local, 1_200_000);
    }

    #[test]
    fn converted_price_rounds() {
        let html = row(1, "<td><span>3 р.</span></td>");
        let listings = extract_listings(&html, 5.17, BASE);
        assert_eq!(listings[0].price_converted, 16); // 15.51 rounds up
        assert!(listings[0].price_converted >= 0);
    }

    #[test]
    fn titleless_row_gets_placeholder_not_dropped() {
        let html = row(42, "<td>2001</td>");
        let listings = extract_listings(&html, 5.0, BASE);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].title, PLACEHOLDER_TITLE);
        assert_eq!(listings[0].price_local, 0);
        assert_eq!(listings[0].price_converted, 0);
    }

    #[test]
    fn rows_without_data_id_are_skipped() {
        let html = r#"<tr><td><span class="make">Header</span></td></tr>"#;
        assert!(extract_listings(html, 5.0, BASE).is_empty());
    }

    // The year cell also matches the 3-4 digit displacement pattern. When
    // the first short cell IS the year, displacement must stay unset.
    #[test]
    fn displacement_distinct_from_year() {
        let same = row(1, "<td>1998</td>");
        let listings = extract_listings(&same, 5.0, BASE);
        assert_eq!(listings[0].year.as_deref(), Some("1998"));
        assert_eq!(listings[0].engine_displacement, None);

        let distinct = row(2, "<td>399</td><td>1998</td>");
        let listings = extract_listings(&distinct, 5.0, BASE);
        assert_eq!(listings[0].year.as_deref(), Some("1998"));
        assert_eq!(listings[0].engine_displacement.as_deref(), Some("399"));
    }

    // Only the first short digit cell is ever considered. When the year
    // cell comes first it shadows a real displacement cell behind it.
    // Pinned behavior, not a bug to fix.
    #[test]
    fn displacement_shadowed_by_leading_year_cell() {
        let html = row(3, "<td>2002</td><td>1100</td>");
        let listings = extract_listings(&html, 5.0, BASE);
        assert_eq!(listings[0].year.as_deref(), Some("2002"));
        assert_eq!(listings[0].engine_displacement, None);
    }

    #[test]
    fn absolute_image_url_untouched() {
        let html = row(5, r#"<td><img src="https://cdn.example.com/a.jpg"></td>"#);
        let listings = extract_listings(&html, 5.0, BASE);
        assert_eq!(listings[0].image_url, "https://cdn.example.com/a.jpg");
        // re-applying the rewrite is a no-op
        assert_eq!(
            absolutize(BASE, &listings[0].image_url),
            listings[0].image_url
        );
    }

    #[test]
    fn entity_cleanup_in_matched_text() {
        let html = row(6, r#"<td><span class="make">HONDA&nbsp;VTR250&#13;</span></td>"#);
        let listings = extract_listings(&html, 5.0, BASE);
        assert_eq!(listings[0].title, "HONDA VTR250");
    }

    #[test]
    fn document_order_and_purity() {
        let html = format!(
            "{}{}{}",
            row(3, r#"<td><span class="make">C</span></td>"#),
            row(1, r#"<td><span class="make">A</span></td>"#),
            row(2, r#"<td><span class="make">B</span></td>"#)
        );
        let first = extract_listings(&html, 5.0, BASE);
        let ids: Vec<u64> = first.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);

        let second = extract_listings(&html, 5.0, BASE);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
