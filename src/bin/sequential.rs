use chrono::Local;
use cardprice::{info_time, process::process_card_list_sequential, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Local::now();
    process_card_list_sequential().await?;
    info_time!(start_time, "Full program time:");

    Ok(())
}
