//! Discord gateway event handler.
//!
//! `ready` prepares the bot profile and registers the slash commands;
//! `interaction_create` routes each command to its handler module. Handlers
//! validate the channel, access and spam throttle before calling into
//! `chanmark-core`.

use std::{path::Path, sync::Arc};

use serenity::{
    all::{
        ActivityData, Command, CommandInteraction, Context, CreateAttachment,
        CreateInteractionResponse, CreateInteractionResponseFollowup,
        CreateInteractionResponseMessage, EditProfile, EventHandler, GatewayIntents, Interaction,
        OnlineStatus, Permissions, Ready,
    },
    async_trait,
};
use tracing::{error, info, warn};

use chanmark_core::{
    domain::{Requester, RoleId, UserId},
    replies::UNEXPECTED_FAILURE,
};

use crate::router::AppState;

mod admin;
pub mod commands;
mod info;
mod mark;

pub struct Handler {
    state: Arc<AppState>,
}

impl Handler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Slash commands only need guild events; message content is never read.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_name = %ready.user.name,
            guilds = ready.guilds.len(),
            "discord bot ready"
        );

        ensure_avatar(&ctx, &ready, &self.state.cfg.profile_picture_path()).await;

        ctx.set_presence(
            Some(ActivityData::watching("being opensource!")),
            OnlineStatus::Online,
        );

        let definitions = {
            let markers = self.state.markers.read().await;
            commands::definitions(&markers, self.state.cfg.admin_only)
        };
        match Command::set_global_commands(&ctx.http, definitions).await {
            Ok(synced) => info!(count = synced.len(), "synced slash commands"),
            Err(e) => error!(error = %e, "failed to sync commands"),
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(cmd) = interaction else {
            return;
        };

        if let Err(e) = commands::handle_command(&ctx, &cmd, &self.state).await {
            error!(command = %cmd.data.name, user = %cmd.user.name, error = %e, "command error");
            report_failure(&ctx, &cmd).await;
        }
    }
}

/// Upload `assets/profile_picture.png` as the avatar if the bot has none yet.
async fn ensure_avatar(ctx: &Context, ready: &Ready, path: &Path) {
    if ready.user.avatar.is_some() {
        return;
    }
    if !path.exists() {
        warn!(path = %path.display(), "profile picture not found");
        return;
    }

    let attachment = match CreateAttachment::path(path).await {
        Ok(a) => a,
        Err(e) => {
            error!(error = %e, "failed to read profile picture");
            return;
        }
    };

    let mut me = ready.user.clone();
    match me
        .edit(&ctx.http, EditProfile::new().avatar(&attachment))
        .await
    {
        Ok(()) => info!("updated bot profile picture"),
        Err(e) => error!(error = %e, "failed to update bot avatar"),
    }
}

/// Access-control view of whoever invoked `cmd`.
pub(crate) fn requester(cmd: &CommandInteraction) -> Requester {
    let member = cmd.member.as_deref();
    Requester {
        user_id: UserId(cmd.user.id.get()),
        roles: member
            .map(|m| m.roles.iter().map(|r| RoleId(r.get())).collect())
            .unwrap_or_default(),
        is_admin: member
            .and_then(|m| m.permissions)
            .is_some_and(|p| p.contains(Permissions::ADMINISTRATOR)),
    }
}

pub(crate) async fn respond(
    ctx: &Context,
    cmd: &CommandInteraction,
    content: &str,
) -> serenity::Result<()> {
    cmd.create_response(
        &ctx.http,
        CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .content(content)
                .ephemeral(true),
        ),
    )
    .await
}

pub(crate) async fn followup(
    ctx: &Context,
    cmd: &CommandInteraction,
    content: &str,
) -> serenity::Result<()> {
    cmd.create_followup(
        &ctx.http,
        CreateInteractionResponseFollowup::new()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

// The interaction may or may not have been answered (or deferred) already.
async fn report_failure(ctx: &Context, cmd: &CommandInteraction) {
    if respond(ctx, cmd, UNEXPECTED_FAILURE).await.is_ok() {
        return;
    }
    if let Err(e) = followup(ctx, cmd, UNEXPECTED_FAILURE).await {
        warn!(error = %e, "failed to report command failure");
    }
}
