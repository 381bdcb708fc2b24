use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregator::fetcher::{FetchError, PageSource};

#[derive(Debug, Clone, Serialize)]
pub struct Brand {
    pub id: u32,
    pub name: String,
    pub index_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Model {
    pub id: u32,
    pub name: String,
    pub brand_id: u32,
    pub listing_url: String,
}

pub fn brand_url(base_url: &str, brand_id: u32) -> String {
    format!("{base_url}/brands/{brand_id}")
}

pub fn model_url(base_url: &str, brand_id: u32, model_id: u32) -> String {
    format!("{base_url}/brands/{brand_id}/models/{model_id}")
}

// Popular models with steady auction volume, used as the default source
// set when no live discovery has run. (brand_id, model_id, name)
static POPULAR_MODELS: &[(u32, u32, &str)] = &[
    // Honda
    (2, 1430, "CB1000R"),
    (2, 1432, "CBR1000RR"),
    (2, 1419, "Africa Twin"),
    (2, 1391, "Gold Wing"),
    // Yamaha
    (1, 746, "YZF-R1"),
    (1, 747, "YZF-R6"),
    (1, 569, "MT-09"),
    (1, 568, "MT-07"),
    // Suzuki
    (3, 1586, "GSX-R1000"),
    (3, 1560, "Hayabusa"),
    (3, 1533, "V-Strom 650"),
    // Kawasaki
    (4, 1830, "Ninja ZX-10R"),
    (4, 1832, "Ninja ZX-6R"),
    (4, 1888, "Z900RS"),
    // BMW
    (13, 1317, "S1000RR"),
    (13, 1311, "R1200GS"),
    // Ducati
    (7, 1047, "Panigale"),
    (7, 1060, "Monster"),
];

/// Built-in registry of popular models. Loaded once, immutable.
pub fn popular_models(base_url: &str) -> Vec<Model> {
    POPULAR_MODELS
        .iter()
        .map(|&(brand_id, id, name)| Model {
            id,
            name: name.to_string(),
            brand_id,
            listing_url: model_url(base_url, brand_id, id),
        })
        .collect()
}

/// Listing-page URLs for the built-in registry, at most `limit` of them
/// (0 means all).
pub fn default_sources(base_url: &str, limit: usize) -> Vec<String> {
    let mut urls: Vec<String> = popular_models(base_url)
        .into_iter()
        .map(|m| m.listing_url)
        .collect();
    if limit > 0 {
        urls.truncate(limit);
    }
    urls
}

/// Fetches and parses the brand-index page.
pub async fn fetch_brands(
    fetcher: &dyn PageSource,
    base_url: &str,
) -> Result<Vec<Brand>, FetchError> {
    let html = fetcher.fetch_html(&brand_url_index(base_url)).await?;
    let brands = parse_brands(&html, base_url);
    debug!(count = brands.len(), "Parsed brand index");
    Ok(brands)
}

/// Fetches and parses a brand's model list, keeping at most `limit`
/// models (0 means all).
pub async fn fetch_models(
    fetcher: &dyn PageSource,
    base_url: &str,
    brand: &Brand,
    limit: usize,
) -> Result<Vec<Model>, FetchError> {
    let html = fetcher.fetch_html(&brand.index_url).await?;
    let mut models = parse_models(&html, base_url, brand.id);
    if limit > 0 {
        models.truncate(limit);
    }
    debug!(brand = %brand.name, count = models.len(), "Parsed model list");
    Ok(models)
}

/// Live discovery: walk the brand index, then each brand's model list,
/// collecting listing-page URLs. A brand whose model page fails is
/// skipped, it does not abort discovery.
pub async fn discover_sources(
    fetcher: &dyn PageSource,
    base_url: &str,
    models_per_brand: usize,
    limit: usize,
) -> Result<Vec<String>, FetchError> {
    let brands = fetch_brands(fetcher, base_url).await?;
    let mut urls = Vec::new();

    for brand in &brands {
        let models = match fetch_models(fetcher, base_url, brand, models_per_brand).await {
            Ok(m) => m,
            Err(e) => {
                warn!(brand = %brand.name, error = %e, "Skipping brand during discovery");
                continue;
            }
        };
        urls.extend(models.into_iter().map(|m| m.listing_url));
        if limit > 0 && urls.len() >= limit {
            break;
        }
    }

    if limit > 0 {
        urls.truncate(limit);
    }
    Ok(urls)
}

fn brand_url_index(base_url: &str) -> String {
    format!("{base_url}/brands")
}

fn brand_link_selector() -> Selector {
    Selector::parse(r#"a[href^="/brands/"]"#).unwrap()
}

pub fn parse_brands(html: &str, base_url: &str) -> Vec<Brand> {
    let document = Html::parse_document(html);
    let selector = brand_link_selector();
    let mut brands = Vec::new();

    for el in document.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        // brand links are exactly /brands/{id}
        let Some(rest) = href.strip_prefix("/brands/") else {
            continue;
        };
        let Ok(id) = rest.parse::<u32>() else {
            continue;
        };
        if id == 0 {
            continue;
        }
        let name = el.text().collect::<String>().trim().to_string();
        brands.push(Brand {
            id,
            name,
            index_url: brand_url(base_url, id),
        });
    }

    brands
}

pub fn parse_models(html: &str, base_url: &str, brand_id: u32) -> Vec<Model> {
    let document = Html::parse_document(html);
    let selector = brand_link_selector();
    let prefix = format!("/brands/{brand_id}/models/");
    let mut models = Vec::new();

    for el in document.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(rest) = href.strip_prefix(prefix.as_str()) else {
            continue;
        };
        let Ok(id) = rest.parse::<u32>() else {
            continue;
        };
        if id == 0 {
            continue;
        }
        let name = el.text().collect::<String>().trim().to_string();
        models.push(Model {
            id,
            name,
            brand_id,
            listing_url: model_url(base_url, brand_id, id),
        });
    }

    models
}
