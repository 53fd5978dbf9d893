use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tokio::{
    fs,
    sync::{OwnedSemaphorePermit, Semaphore},
    task::{spawn_blocking, JoinSet},
};

use crate::browser::{BrowserSession, ChromiumSession};
use crate::export::{write_xlsx, OfferTable};
use crate::fetch::{fetch_in_new_page, fetch_offer, FetchOptions};
use crate::{info_time, Error, Offer, Result, INPUT_FILE, MAX_CONCURRENT_FETCHES, OUTPUT_FILE};

/// Caps how many fetch pipelines run against the shared browser at once.
#[derive(Debug, Clone)]
pub struct FetchGovernor {
    slots: Arc<Semaphore>,
}

impl FetchGovernor {
    pub fn new(limit: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(limit)),
        }
    }

    /// Waits for a free slot. The slot is released when the permit is dropped.
    pub async fn admit(&self) -> Result<OwnedSemaphorePermit> {
        Ok(self.slots.clone().acquire_owned().await?)
    }
}

/// Scrapes every card in `card_names.txt` with a page per card and writes the results.
pub async fn process_card_list() -> Result<()> {
    let start_time = Local::now();
    let names = read_card_names(INPUT_FILE).await?;
    info_time!("Started scraping {} cards", names.len());

    let session = Arc::new(ChromiumSession::launch().await?);
    let offers = process_cards(
        session.clone(),
        names,
        FetchOptions::concurrent(),
        MAX_CONCURRENT_FETCHES,
    )
    .await;
    close_session(session).await?;
    let offers = offers?;
    info_time!(start_time, "Finished scraping.");

    export_offers(OUTPUT_FILE, offers).await
}

/// Same as `process_card_list`, but one card after another on a single page.
pub async fn process_card_list_sequential() -> Result<()> {
    let start_time = Local::now();
    let names = read_card_names(INPUT_FILE).await?;
    info_time!("Started scraping {} cards", names.len());

    let session = ChromiumSession::launch().await?;
    let offers = process_cards_sequential(&session, &names, &FetchOptions::sequential()).await;
    session.close().await?;
    let offers = offers?;
    info_time!(start_time, "Finished scraping.");

    export_offers(OUTPUT_FILE, offers).await
}

/// One trimmed card name per line. Blank lines stay in as empty names so every line
/// gets a row.
pub async fn read_card_names(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).await?;
    let names = contents.lines().map(|line| line.trim().to_owned()).collect();
    Ok(names)
}

/// Blank names aren't searched for, they're reported as not found right away.
fn blank_card(name: &str) -> Option<Offer> {
    name.is_empty().then(|| Offer::not_found(name))
}

/// Fetches all cards at once, at most `limit` at a time.
/// The returned offers are in the same order as `names`. The first error aborts the batch.
pub async fn process_cards<S>(
    session: Arc<S>,
    names: Vec<String>,
    options: FetchOptions,
    limit: usize,
) -> Result<Vec<Offer>>
where
    S: BrowserSession + 'static,
{
    let governor = FetchGovernor::new(limit);
    let options = Arc::new(options);
    let mut task_set = JoinSet::new();

    let card_count = names.len();
    for (idx, name) in names.into_iter().enumerate() {
        task_set.spawn({
            let session = session.clone();
            let governor = governor.clone();
            let options = options.clone();

            async move {
                if let Some(offer) = blank_card(&name) {
                    return Ok((idx, offer));
                }
                let _slot = governor.admit().await?;
                let offer = fetch_in_new_page(&*session, &name, &options).await?;
                Ok::<_, Error>((idx, offer))
            }
        });
    }

    let mut offers = vec![None; card_count];
    while let Some(task) = task_set.join_next().await {
        match task.map_err(Error::from).and_then(|res| res) {
            Ok((idx, offer)) => offers[idx] = Some(offer),
            Err(e) => {
                // Wait for the aborted tasks, so they no longer hold the session.
                task_set.shutdown().await;
                return Err(e);
            }
        }
    }
    Ok(offers.into_iter().flatten().collect())
}

/// Fetches the cards one by one, reusing a single page.
pub async fn process_cards_sequential(
    session: &dyn BrowserSession,
    names: &[String],
    options: &FetchOptions,
) -> Result<Vec<Offer>> {
    let mut page = session.new_page().await?;
    let mut offers = Vec::with_capacity(names.len());
    let mut outcome = Ok(());
    for name in names {
        let offer = match blank_card(name) {
            Some(offer) => Ok(offer),
            None => fetch_offer(page.as_mut(), name, options).await,
        };
        match offer {
            Ok(offer) => offers.push(offer),
            Err(e) => {
                outcome = Err(e);
                break;
            }
        }
    }
    page.close().await?;
    outcome.map(|()| offers)
}

async fn close_session(session: Arc<ChromiumSession>) -> Result<()> {
    // All fetch tasks are joined by now, so this is the last handle.
    match Arc::into_inner(session) {
        Some(session) => session.close().await,
        None => Ok(()),
    }
}

/// Prints the results and writes them to the spreadsheet at `path`.
async fn export_offers(path: impl Into<PathBuf>, offers: Vec<Offer>) -> Result<()> {
    let local_now = Local::now();
    println!("{}", OfferTable(&offers));

    let path = path.into();
    spawn_blocking({
        let path = path.clone();
        move || write_xlsx(path, &offers)
    })
    .await??;
    info_time!(local_now, "Wrote the results to file: {}", path.display());
    Ok(())
}
