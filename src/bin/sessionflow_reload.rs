//! Sessionflow full reload.
//!
//! Rebuilds canonical sessions, effect rollups and merged sessions from the
//! raw tables in one transaction. Takes no arguments; configuration comes from
//! `config.yaml`, `SESSIONFLOW_CONFIG` and `SESSIONFLOW__*` variables.

use tracing::{error, info};

use sessionflow::config::Config;
use sessionflow::storage;
use sessionflow::utils::bootstrap::init_tracing;
use sessionflow::ReloadController;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;
    let pool = storage::connect(&config.storage).await?;

    let controller = ReloadController::new(pool.clone(), &config.pipeline);
    let result = controller.run().await;
    pool.close().await;

    match result {
        Ok(()) => {
            info!(path = %config.storage.path, "Reload finished");
            Ok(())
        }
        Err(e) => {
            error!(
                stage = %e.stage(),
                code = e.code().as_deref().unwrap_or(""),
                error = %e,
                "Reload aborted, previous snapshot kept"
            );
            Err(e.into())
        }
    }
}
