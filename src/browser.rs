//! Browser abstraction for the search results pages.
//!
//! `BrowserSession` hands out pages, `SearchPage` is the handful of interactions the fetch
//! pipeline needs. `ChromiumSession` implements both on top of chromiumoxide.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::EventLifecycleEvent;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::parse::{extract_result_links, ResultLink};
use crate::{info_time, Error, Result, NAVIGATION_TIMEOUT_MS, RESULT_LINK_SELECTOR};

/// How long `goto` waits after the navigation was committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// The `load` event fired.
    Load,
    /// Chromium reported the `networkIdle` lifecycle event for the new document.
    NetworkIdle,
}

/// A browser that can open pages. Implementations are shared between tasks.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn SearchPage>>;
}

/// A single open page.
#[async_trait]
pub trait SearchPage: Send {
    async fn goto(&mut self, url: &str, wait: WaitUntil) -> Result<()>;
    /// Clicks the first element whose own text contains `text`.
    async fn click_text(&mut self, text: &str) -> Result<()>;
    /// Sets the first element matching `selector` to `value` and fires `change`.
    async fn select_option(&mut self, selector: &str, value: &str) -> Result<()>;
    /// Current DOM serialized to HTML.
    async fn content(&mut self) -> Result<String>;
    /// Every anchor in the results container, its text one line per rendered line.
    /// Defaults to parsing a `content` snapshot.
    async fn result_links(&mut self) -> Result<Vec<ResultLink>> {
        let html = Arc::new(self.content().await?);
        extract_result_links(html).await
    }
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Headless Chromium with a single browsing context that every page is opened in.
pub struct ChromiumSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    pub async fn launch() -> Result<Self> {
        let config = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(Error::BrowserConfig)?;

        let (browser, mut handler) = Browser::launch(config).await?;

        // The CDP connection only makes progress while its handler is polled.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info_time!("Launched browser");
        Ok(Self { browser, handler })
    }

    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        self.browser.wait().await?;
        self.handler.await?;
        info_time!("Closed browser");
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&self) -> Result<Box<dyn SearchPage>> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(Box::new(ChromiumPage { page }))
    }
}

pub struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    /// Runs a script that reports whether it found its target element.
    async fn run_interaction(&self, script: String, target: &str) -> Result<()> {
        let found: bool = self.page.evaluate(script).await?.into_value()?;
        if !found {
            return Err(Error::MissingElement(target.into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchPage for ChromiumPage {
    async fn goto(&mut self, url: &str, wait: WaitUntil) -> Result<()> {
        // Subscribed before navigating so the new document's events can't be missed.
        let mut lifecycle = self.page.event_listener::<EventLifecycleEvent>().await?;

        let navigation = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            if wait == WaitUntil::NetworkIdle {
                let main_frame = self.page.mainframe().await?;
                // `init` opens the lifecycle of a committed document, earlier events belong
                // to the previous one.
                let mut committed = false;
                while let Some(event) = lifecycle.next().await {
                    if Some(&event.frame_id) != main_frame.as_ref() {
                        continue;
                    }
                    match event.name.as_str() {
                        "init" => committed = true,
                        "networkIdle" if committed => break,
                        _ => {}
                    }
                }
            }
            Ok::<_, Error>(())
        };

        tokio::time::timeout(Duration::from_millis(NAVIGATION_TIMEOUT_MS), navigation)
            .await
            .map_err(|_| Error::NavigationTimeout(url.into()))?
    }

    async fn click_text(&mut self, text: &str) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const wanted = {wanted};
                const el = Array.from(document.querySelectorAll('body *')).find(e =>
                    Array.from(e.childNodes).some(n =>
                        n.nodeType === Node.TEXT_NODE && n.textContent.includes(wanted)));
                if (!el) return false;
                el.click();
                return true;
            }})()"#,
            wanted = serde_json::to_string(text)?,
        );
        self.run_interaction(script, text).await
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        let script = format!(
            r#"(() => {{
                const el = document.querySelector({selector_js});
                if (!el) return false;
                el.value = {value_js};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
            selector_js = serde_json::to_string(selector)?,
            value_js = serde_json::to_string(value)?,
        );
        self.run_interaction(script, selector).await
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    /// Reads `innerText`, so hidden elements are skipped and inline siblings share a line.
    async fn result_links(&mut self) -> Result<Vec<ResultLink>> {
        let script = format!(
            "Array.from(document.querySelectorAll({selector_js}))\
                .map(a => ({{ text: a.innerText, href: a.getAttribute('href') }}))",
            selector_js = serde_json::to_string(RESULT_LINK_SELECTOR)?,
        );
        let params = EvaluateParams::builder()
            .expression(script)
            .return_by_value(true)
            .build()
            .map_err(Error::BrowserScript)?;
        Ok(self.page.evaluate(params).await?.into_value()?)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}
