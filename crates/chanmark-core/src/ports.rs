use std::time::Duration;

use async_trait::async_trait;

use crate::{domain::ChannelId, errors::Error};

/// Failure of a single external rename call.
///
/// Rate limiting is an expected, recoverable signal and gets its own variant so
/// callers have to handle it explicitly; everything else is a plain [`Error`].
#[derive(Debug, thiserror::Error)]
pub enum RenameError {
    #[error("rate limited; retry after {:.1}s", .retry_after.as_secs_f64())]
    RateLimited { retry_after: Duration },

    #[error(transparent)]
    Failed(#[from] Error),
}

/// Hexagonal port for the one side-effecting call the guard makes outward.
#[async_trait]
pub trait ChannelRenamer: Send + Sync {
    async fn rename_channel(
        &self,
        channel_id: ChannelId,
        name: &str,
    ) -> std::result::Result<(), RenameError>;
}
