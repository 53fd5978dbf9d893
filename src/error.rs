use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("The selector you are trying to scrape for is missing. Selector: {0}")]
    ParseMissingSelector(String),
    #[error("Couldn't find the element to interact with: {0}")]
    MissingElement(String),
    #[error("Navigation to {0} didn't settle in time.")]
    NavigationTimeout(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
    #[error("The fetch governor was closed while a card was waiting for a slot.")]
    GovernorClosed(#[from] tokio::sync::AcquireError),

    #[error("Browser Error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
    #[error("Couldn't configure the browser: {0}")]
    BrowserConfig(String),
    #[error("Couldn't build the page script: {0}")]
    BrowserScript(String),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Base64 Error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Xlsx Error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}
