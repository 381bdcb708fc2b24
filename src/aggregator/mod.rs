pub mod currency;
pub mod fetcher;
pub mod models;
pub mod parser;
pub mod service;

pub use fetcher::{FetchError, HttpFetcher, PageSource};
pub use models::{ExchangeRate, Listing};
pub use service::{AggregatorService, PassState};
