use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tokio::task::spawn_blocking;

use crate::{Error, Result, BASE_URL, RESULT_LINK_SELECTOR};

const CURRENCY_MARKER: &str = "zł";

/// One listing on the search results page, or a "not found" placeholder when only `name` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Offer {
    pub name: String,
    pub price: Option<f64>,
    pub cards: Option<u32>,
    pub link: Option<String>,
}

impl Offer {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            price: None,
            cards: None,
            link: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.price.is_some()
    }
}

/// An anchor from the results container: its rendered text and href.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResultLink {
    pub text: String,
    pub href: Option<String>,
}

/// Turns the text and href of one result link into an `Offer`.
///
/// The first line is the product name. A digits-only line is the stock count and a line
/// with `zł` is the price; when several lines match, the last one wins.
pub fn parse_card_link(text: &str, href: Option<&str>) -> Offer {
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>();

    let mut offer = Offer::not_found(lines.first().copied().unwrap_or_default());
    for line in &lines {
        if line.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(cards) = line.parse() {
                offer.cards = Some(cards);
            }
        }
        if line.contains(CURRENCY_MARKER) {
            if let Some(price) = parse_price(line) {
                offer.price = Some(price);
            }
        }
    }
    offer.link = href.map(|href| format!("{BASE_URL}{}", href.replace(' ', "%20")));
    offer
}

/// `"1 234,50 zł"` -> `1234.5`
fn parse_price(line: &str) -> Option<f64> {
    line.replace(CURRENCY_MARKER, "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect::<String>()
        .parse()
        .ok()
}

/// The results are safe to read once there is at least one link and none of them
/// shows a stock of `0`.
pub fn results_ready(links: &[ResultLink]) -> bool {
    !links.is_empty()
        && links
            .iter()
            .all(|link| !link.text.split('\n').any(|line| line == "0"))
}

/// Parses the page snapshot on the blocking pool, since `Html` isn't `Send`.
pub(crate) async fn extract_result_links(html: Arc<String>) -> Result<Vec<ResultLink>> {
    let links = spawn_blocking(move || parse_result_links(&html)).await??;
    Ok(links)
}

/// Collects every anchor inside the results container.
pub fn parse_result_links(html: &str) -> Result<Vec<ResultLink>> {
    let doc = Html::parse_document(html);
    let link_selector = create_selector(RESULT_LINK_SELECTOR)?;

    let links = doc
        .select(&link_selector)
        .map(|anchor| ResultLink {
            text: rendered_lines(anchor),
            href: anchor.value().attr("href").map(str::to_owned),
        })
        .collect();
    Ok(links)
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseMissingSelector(sel_str.into()))
}

/// Text nodes as lines. Unlike `innerText` this can't see styles, so hidden elements are
/// included and inline siblings get their own line.
fn rendered_lines(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
