use std::sync::Arc;

use sr_core::{config::Config, store::StoreHandle};
use sr_sheets::GoogleSheetsStore;

#[tokio::main]
async fn main() -> Result<(), sr_core::Error> {
    sr_core::logging::init("sr")?;

    let cfg = Arc::new(Config::load()?);

    let sheets =
        GoogleSheetsStore::connect(cfg.credentials_path.clone(), cfg.spreadsheet.clone()).await?;
    tracing::info!(spreadsheet = %sheets.spreadsheet_id(), "store ready");
    let store = Arc::new(StoreHandle::new(sheets));

    sr_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| sr_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
