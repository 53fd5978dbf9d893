//! In-memory stand-in for Chromium, scripted per test.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::browser::{BrowserSession, SearchPage, WaitUntil};
use crate::hash::decode_query_hash;
use crate::{Error, Result};

pub(crate) fn listing(title: &str, stock: u32, price: &str) -> String {
    format!(
        r#"<a href="/card/{title}"><div><h3>{title}</h3></div><span>{stock}</span><p>{price}</p></a>"#
    )
}

pub(crate) fn results_page(listings: &[String]) -> String {
    format!(
        r#"<html><body><a href="/">mtgspot</a><div class="pb-12">{}</div></body></html>"#,
        listings.concat()
    )
}

#[derive(Debug, Clone)]
pub(crate) enum PageScript {
    /// Every `content` call returns the next snapshot, the last one repeats.
    Snapshots(Vec<String>),
    /// The in-stock filter isn't on the page.
    MissingFilter,
    /// Serves one listing titled after the searched card, after `delay`.
    /// Cards named `missing*` never get past the loading state, on `broken*` cards the
    /// in-stock filter is missing.
    PerCard { delay: Duration },
}

#[derive(Debug, Default)]
struct SessionState {
    actions: Vec<String>,
    pages_opened: usize,
    open_pages: usize,
    max_open_pages: usize,
}

#[derive(Clone)]
pub(crate) struct FakeSession {
    script: PageScript,
    state: Arc<Mutex<SessionState>>,
}

impl FakeSession {
    pub(crate) fn new(script: PageScript) -> Self {
        Self {
            script,
            state: Arc::default(),
        }
    }

    pub(crate) fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub(crate) fn pages_opened(&self) -> usize {
        self.state.lock().unwrap().pages_opened
    }

    pub(crate) fn open_pages(&self) -> usize {
        self.state.lock().unwrap().open_pages
    }

    pub(crate) fn max_open_pages(&self) -> usize {
        self.state.lock().unwrap().max_open_pages
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn SearchPage>> {
        {
            let mut state = self.state.lock().unwrap();
            state.pages_opened += 1;
            state.open_pages += 1;
            state.max_open_pages = state.max_open_pages.max(state.open_pages);
        }
        Ok(Box::new(FakePage {
            script: self.script.clone(),
            state: self.state.clone(),
            snapshot: 0,
            card: String::new(),
        }))
    }
}

struct FakePage {
    script: PageScript,
    state: Arc<Mutex<SessionState>>,
    snapshot: usize,
    card: String,
}

impl FakePage {
    fn record(&self, action: String) {
        self.state.lock().unwrap().actions.push(action);
    }
}

#[async_trait]
impl SearchPage for FakePage {
    async fn goto(&mut self, url: &str, wait: WaitUntil) -> Result<()> {
        self.record(format!("goto {url} {wait:?}"));
        let (_, token) = url.split_once("hash=").expect("search url without a hash");
        self.card = decode_query_hash(token)?.name;
        self.snapshot = 0;
        Ok(())
    }

    async fn click_text(&mut self, text: &str) -> Result<()> {
        let broken = matches!(self.script, PageScript::PerCard { .. })
            && self.card.starts_with("broken");
        if matches!(self.script, PageScript::MissingFilter) || broken {
            return Err(Error::MissingElement(text.into()));
        }
        self.record(format!("click {text}"));
        Ok(())
    }

    async fn select_option(&mut self, selector: &str, value: &str) -> Result<()> {
        self.record(format!("select {selector}={value}"));
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        match &self.script {
            PageScript::Snapshots(snapshots) => {
                let html = snapshots[self.snapshot.min(snapshots.len() - 1)].clone();
                self.snapshot += 1;
                Ok(html)
            }
            PageScript::MissingFilter => Ok(String::new()),
            PageScript::PerCard { delay } => {
                tokio::time::sleep(*delay).await;
                let stock = if self.card.starts_with("missing") { 0 } else { 4 };
                Ok(results_page(&[listing(&self.card, stock, "1,00 zł")]))
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.lock().unwrap().open_pages -= 1;
        Ok(())
    }
}
