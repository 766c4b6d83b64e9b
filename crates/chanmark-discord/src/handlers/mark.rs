use serenity::all::{CommandInteraction, Context};
use tracing::{error, info};

use chanmark_core::{
    domain::ChannelId,
    marker::Marker,
    replies::{checkmark_reply, command_cooldown_reply, mark_error_reply, mark_reply, NOT_ALLOWED},
    RenameOutcome,
};

use crate::router::AppState;

use super::{commands::text_channel, followup, requester, respond};

/// Toggle `marker` on the invoking channel's name.
pub(super) async fn toggle(
    ctx: &Context,
    cmd: &CommandInteraction,
    state: &AppState,
    marker: Marker,
) -> anyhow::Result<()> {
    let Some(channel) = text_channel(ctx, cmd).await? else {
        return Ok(());
    };

    if !state.access.can_mark(&requester(cmd)) {
        respond(ctx, cmd, NOT_ALLOWED).await?;
        return Ok(());
    }

    let channel_id = ChannelId(channel.id.get());
    let (allowed, wait) = state.throttle.lock().await.check(channel_id);
    if !allowed {
        let wait = wait.unwrap_or_default();
        respond(ctx, cmd, &command_cooldown_reply(wait)).await?;
        return Ok(());
    }

    let (new_name, action) = marker.toggle(&channel.name);

    // Waiting on the channel lock can outlast the interaction's 3s window.
    cmd.defer_ephemeral(&ctx.http).await?;

    let reply = match state
        .guard
        .attempt_rename_with(state.renamer.as_ref(), channel_id, &channel.name, &new_name)
        .await
    {
        Ok(outcome) => {
            if outcome == RenameOutcome::Renamed {
                info!(
                    "Emoji {action} in channel {new_name} by {}",
                    cmd.user.name
                );
            }
            mark_reply(action, &outcome)
        }
        Err(e) => {
            error!(command = %marker.name, channel = %channel_id, error = %e, "rename failed");
            mark_error_reply(&e)
        }
    };

    followup(ctx, cmd, &reply).await?;
    Ok(())
}

/// Report when the invoking channel leaves its rename cooldown.
pub(super) async fn checkmark(
    ctx: &Context,
    cmd: &CommandInteraction,
    state: &AppState,
) -> anyhow::Result<()> {
    let Some(channel) = text_channel(ctx, cmd).await? else {
        return Ok(());
    };

    let (eligible, remaining) = state.guard.can_modify(ChannelId(channel.id.get()));
    respond(ctx, cmd, &checkmark_reply(eligible, remaining)).await?;
    Ok(())
}
