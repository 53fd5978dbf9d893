use std::time::Duration;

use tokio::time::{sleep, timeout};

use crate::browser::{BrowserSession, SearchPage, WaitUntil};
use crate::hash::search_url;
use crate::parse::{parse_card_link, results_ready, Offer, ResultLink};
use crate::{
    card_status, info_time, Result, CONCURRENT_READY_TIMEOUT_MS, IN_STOCK_LABEL,
    READY_POLL_INTERVAL_MS, SCOPE_ALL, SCOPE_SELECT, SEQUENTIAL_READY_TIMEOUT_MS,
};

/// Per-mode knobs of the fetch pipeline.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub wait_until: WaitUntil,
    pub ready_timeout: Duration,
    pub poll_interval: Duration,
}

impl FetchOptions {
    /// A fresh page per card, waiting for the network to go quiet.
    pub fn concurrent() -> Self {
        Self {
            wait_until: WaitUntil::NetworkIdle,
            ready_timeout: Duration::from_millis(CONCURRENT_READY_TIMEOUT_MS),
            poll_interval: Duration::from_millis(READY_POLL_INTERVAL_MS),
        }
    }

    /// One page reused for every card.
    pub fn sequential() -> Self {
        Self {
            wait_until: WaitUntil::Load,
            ready_timeout: Duration::from_millis(SEQUENTIAL_READY_TIMEOUT_MS),
            poll_interval: Duration::from_millis(READY_POLL_INTERVAL_MS),
        }
    }
}

/// Opens a page for a single card, fetches its cheapest offer and closes the page again.
pub async fn fetch_in_new_page(
    session: &dyn BrowserSession,
    name: &str,
    options: &FetchOptions,
) -> Result<Offer> {
    let mut page = session.new_page().await?;
    let offer = fetch_offer(page.as_mut(), name, options).await;
    page.close().await?;
    offer
}

/// Searches for `name` on `page` and returns the cheapest in-stock offer.
/// If the results never become ready within the timeout, returns `Offer::not_found`.
pub async fn fetch_offer(
    page: &mut dyn SearchPage,
    name: &str,
    options: &FetchOptions,
) -> Result<Offer> {
    info_time!("{}", name);

    page.goto(&search_url(name), options.wait_until).await?;
    page.click_text(IN_STOCK_LABEL).await?;
    page.select_option(SCOPE_SELECT, SCOPE_ALL).await?;

    let Ok(links) = timeout(options.ready_timeout, poll_until_ready(page, options)).await else {
        card_status!(not_found, name);
        return Ok(Offer::not_found(name));
    };

    let offers: Vec<Offer> = links?
        .iter()
        .map(|link| parse_card_link(&link.text, link.href.as_deref()))
        .collect();

    match select_cheapest(offers) {
        Some(offer) => {
            card_status!(found, name);
            Ok(offer)
        }
        None => {
            card_status!(not_found, name);
            Ok(Offer::not_found(name))
        }
    }
}

/// Reads the result links until they pass `results_ready`.
async fn poll_until_ready(
    page: &mut dyn SearchPage,
    options: &FetchOptions,
) -> Result<Vec<ResultLink>> {
    loop {
        let links = page.result_links().await?;
        if results_ready(&links) {
            return Ok(links);
        }
        sleep(options.poll_interval).await;
    }
}

/// Cheapest offer that has a price. On ties the one listed first wins.
pub fn select_cheapest(offers: Vec<Offer>) -> Option<Offer> {
    offers
        .into_iter()
        .filter_map(|offer| offer.price.map(|price| (price, offer)))
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, offer)| offer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{listing, results_page, FakeSession, PageScript};

    fn fast() -> FetchOptions {
        FetchOptions {
            wait_until: WaitUntil::NetworkIdle,
            ready_timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn priced(name: &str, price: Option<f64>) -> Offer {
        Offer {
            name: name.into(),
            price,
            cards: Some(1),
            link: Some(format!("https://mtgspot.pl/card/{name}")),
        }
    }

    #[test]
    fn picks_the_cheapest_offer() {
        let offers = vec![
            priced("a", Some(5.0)),
            priced("b", Some(3.2)),
            priced("c", Some(9.9)),
        ];
        assert_eq!(select_cheapest(offers).unwrap().name, "b");
    }

    #[test]
    fn unpriced_offers_are_skipped() {
        let offers = vec![priced("a", None), priced("b", Some(7.0)), priced("c", None)];
        assert_eq!(select_cheapest(offers).unwrap().name, "b");
        assert_eq!(select_cheapest(vec![priced("a", None)]), None);
        assert_eq!(select_cheapest(Vec::new()), None);
    }

    #[test]
    fn ties_keep_page_order() {
        let offers = vec![priced("first", Some(2.0)), priced("second", Some(2.0))];
        assert_eq!(select_cheapest(offers).unwrap().name, "first");
    }

    #[tokio::test]
    async fn fetches_cheapest_once_results_settle() {
        let loading = results_page(&[listing("Opt", 3, "0,50 zł"), listing("Opt", 0, "0,10 zł")]);
        let ready = results_page(&[
            listing("Opt (M21)", 2, "5,00 zł"),
            listing("Opt (ELD)", 7, "3,20 zł"),
            listing("Opt (XLN)", 1, "9,90 zł"),
        ]);
        let session = FakeSession::new(PageScript::Snapshots(vec![String::new(), loading, ready]));
        let mut page = session.new_page().await.unwrap();

        let offer = fetch_offer(page.as_mut(), "Opt", &fast()).await.unwrap();
        assert_eq!(
            offer,
            Offer {
                name: "Opt (ELD)".into(),
                price: Some(3.2),
                cards: Some(7),
                link: Some("https://mtgspot.pl/card/Opt%20(ELD)".into()),
            }
        );

        let actions = session.actions();
        assert_eq!(actions[0], format!("goto {} NetworkIdle", search_url("Opt")));
        assert_eq!(actions[1], "click Tylko na stanie");
        assert_eq!(actions[2], "select select#select=all");
    }

    /// Answers `result_links` with browser-rendered text that differs from its raw markup.
    struct RenderedPage {
        html: String,
        links: Vec<ResultLink>,
    }

    #[async_trait::async_trait]
    impl SearchPage for RenderedPage {
        async fn goto(&mut self, _url: &str, _wait: WaitUntil) -> Result<()> {
            Ok(())
        }
        async fn click_text(&mut self, _text: &str) -> Result<()> {
            Ok(())
        }
        async fn select_option(&mut self, _selector: &str, _value: &str) -> Result<()> {
            Ok(())
        }
        async fn content(&mut self) -> Result<String> {
            Ok(self.html.clone())
        }
        async fn result_links(&mut self) -> Result<Vec<ResultLink>> {
            Ok(self.links.clone())
        }
        async fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn reads_rendered_link_text() {
        let html = r#"<div class="pb-12"><a href="/card/opt"><div>Opt</div><div>3</div>
            <div><span>0,50</span> <span>zł</span></div><span style="display:none">0</span></a></div>"#;
        // The raw markup keeps the hidden zero and splits the price.
        let raw = crate::parse::parse_result_links(html).unwrap();
        assert!(!results_ready(&raw));
        assert_eq!(parse_card_link(&raw[0].text, None).price, None);

        let mut page = RenderedPage {
            html: html.into(),
            links: vec![ResultLink {
                text: "Opt\n3\n0,50 zł".into(),
                href: Some("/card/opt".into()),
            }],
        };
        let offer = fetch_offer(&mut page, "Opt", &fast()).await.unwrap();
        assert_eq!(offer.price, Some(0.5));
        assert_eq!(offer.cards, Some(3));
        assert_eq!(offer.link.as_deref(), Some("https://mtgspot.pl/card/opt"));
    }

    #[tokio::test]
    async fn readiness_timeout_is_not_found() {
        let stuck = results_page(&[listing("Opt", 0, "0,50 zł")]);
        let session = FakeSession::new(PageScript::Snapshots(vec![stuck]));

        let offer = fetch_in_new_page(&session, "Opt", &fast()).await.unwrap();
        assert_eq!(offer, Offer::not_found("Opt"));
        assert_eq!(session.open_pages(), 0);
    }

    #[tokio::test]
    async fn ready_page_without_prices_is_not_found() {
        let page = results_page(&[listing("Opt", 3, "na zapytanie")]);
        let session = FakeSession::new(PageScript::Snapshots(vec![page]));

        let offer = fetch_in_new_page(&session, "Opt", &fast()).await.unwrap();
        assert_eq!(offer, Offer::not_found("Opt"));
    }

    #[tokio::test]
    async fn browser_errors_propagate() {
        let session = FakeSession::new(PageScript::MissingFilter);
        let res = fetch_in_new_page(&session, "Opt", &fast()).await;
        assert!(matches!(res, Err(crate::Error::MissingElement(_))));
        assert_eq!(session.open_pages(), 0);
    }
}
