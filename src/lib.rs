//! CARD PRICE SCRAPER
//! Finds the cheapest in-stock offer on mtgspot.pl for every card in `card_names.txt`
//! and writes them to `cards.xlsx`.

mod error;
mod macros;

pub mod browser;
pub mod export;
pub mod fetch;
pub mod hash;
pub mod parse;
pub mod process;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use parse::Offer;

const BASE_URL: &str = "https://mtgspot.pl";
const INPUT_FILE: &str = "card_names.txt";
const OUTPUT_FILE: &str = "cards.xlsx";

/// Upper bound of fetch pipelines running against the shared browser at once.
pub const MAX_CONCURRENT_FETCHES: usize = 15;
const CONCURRENT_READY_TIMEOUT_MS: u64 = 15_000;
const SEQUENTIAL_READY_TIMEOUT_MS: u64 = 3_000;
const READY_POLL_INTERVAL_MS: u64 = 250;
const NAVIGATION_TIMEOUT_MS: u64 = 30_000;

const IN_STOCK_LABEL: &str = "Tylko na stanie";
const SCOPE_SELECT: &str = "select#select";
const SCOPE_ALL: &str = "all";
const RESULT_LINK_SELECTOR: &str = ".pb-12 a";
