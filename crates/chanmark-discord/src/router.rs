use std::sync::Arc;

use serenity::Client;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use chanmark_core::{
    access::{AccessPolicy, CommandThrottle},
    config::Config,
    marker::MarkerTable,
    ports::ChannelRenamer,
    RenameGuard,
};

use crate::handlers::Handler;
use crate::DiscordRenamer;

/// Shared state for every interaction handler.
pub struct AppState {
    pub cfg: Arc<Config>,
    pub guard: Arc<RenameGuard>,
    pub renamer: Arc<dyn ChannelRenamer>,
    pub markers: RwLock<MarkerTable>,
    pub access: AccessPolicy,
    pub throttle: Mutex<CommandThrottle>,
}

impl AppState {
    pub fn new(
        cfg: Arc<Config>,
        guard: Arc<RenameGuard>,
        renamer: Arc<dyn ChannelRenamer>,
    ) -> Self {
        Self {
            markers: RwLock::new(cfg.marker_table()),
            access: cfg.access_policy(),
            throttle: Mutex::new(CommandThrottle::new(1, cfg.command_cooldown)),
            cfg,
            guard,
            renamer,
        }
    }
}

pub async fn run(cfg: Arc<Config>, guard: Arc<RenameGuard>) -> anyhow::Result<()> {
    let renamer: Arc<dyn ChannelRenamer> = Arc::new(DiscordRenamer::new(
        cfg.discord_token.clone(),
        cfg.discord_api_base.clone(),
    )?);
    let state = Arc::new(AppState::new(cfg.clone(), guard, renamer));

    {
        let markers = state.markers.read().await;
        let names: Vec<&str> = markers.iter().map(|m| m.name.as_str()).collect();
        info!(markers = ?names, admin_only = cfg.admin_only, "starting discord client");
    }

    let mut client = Client::builder(&cfg.discord_token, Handler::intents())
        .event_handler(Handler::new(state))
        .await?;

    client.start().await?;
    Ok(())
}
