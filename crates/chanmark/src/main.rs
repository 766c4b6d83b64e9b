use std::sync::Arc;

use chanmark_core::{config::Config, RenameGuard};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), chanmark_core::Error> {
    let cfg = Arc::new(Config::load()?);
    chanmark_core::logging::init("chanmark", cfg.log_dir.as_deref())?;

    let guard = Arc::new(RenameGuard::default());
    info!(
        cooldown_secs = guard.ledger().window().as_secs(),
        "rename guard ready"
    );

    chanmark_discord::router::run(cfg, guard)
        .await
        .map_err(|e| chanmark_core::Error::External(format!("discord bot failed: {e}")))?;

    Ok(())
}
