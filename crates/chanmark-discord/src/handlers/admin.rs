use serenity::all::{
    Colour, Command, CommandInteraction, Context, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use tracing::{info, warn};

use chanmark_core::{
    access::AccessPolicy,
    config::persist_marker,
    marker::{MarkerTable, DEFAULT_MARKER},
    replies::{setemoji_reply, NOT_ALLOWED},
};

use crate::router::AppState;

use super::{commands, commands::string_option, requester, respond};

pub(super) async fn setemoji(
    ctx: &Context,
    cmd: &CommandInteraction,
    state: &AppState,
) -> anyhow::Result<()> {
    if !state.access.can_administer(&requester(cmd)) {
        respond(ctx, cmd, NOT_ALLOWED).await?;
        return Ok(());
    }

    let Some(emoji) = string_option(cmd, "emoji") else {
        respond(ctx, cmd, "Please provide an emoji.").await?;
        return Ok(());
    };
    let marker = string_option(cmd, "marker").unwrap_or(DEFAULT_MARKER);

    let (old, saved, definitions) = {
        let mut markers = state.markers.write().await;
        let old = match markers.set_emoji(marker, emoji) {
            Ok(old) => old,
            Err(e) => {
                drop(markers);
                respond(ctx, cmd, &format!("Could not set the emoji: {e}.")).await?;
                return Ok(());
            }
        };
        let saved = match persist_marker(&state.cfg.env_file, &markers, marker) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    path = %state.cfg.env_file.display(),
                    error = %e,
                    "failed to persist marker emoji"
                );
                false
            }
        };
        (
            old,
            saved,
            commands::definitions(&markers, state.cfg.admin_only),
        )
    };

    info!(
        "Emoji changed from {old} to {emoji} for /{marker} by {}",
        cmd.user.name
    );
    respond(ctx, cmd, &setemoji_reply(emoji, saved)).await?;

    // Marker command descriptions show the emoji.
    if let Err(e) = Command::set_global_commands(&ctx.http, definitions).await {
        warn!(error = %e, "failed to resync commands after emoji change");
    }
    Ok(())
}

pub(super) async fn markinfo(
    ctx: &Context,
    cmd: &CommandInteraction,
    state: &AppState,
) -> anyhow::Result<()> {
    if !state.access.can_administer(&requester(cmd)) {
        respond(ctx, cmd, NOT_ALLOWED).await?;
        return Ok(());
    }

    let fields = {
        let markers = state.markers.read().await;
        markinfo_fields(&markers, &state.access)
    };

    let embed = CreateEmbed::new()
        .title("Mark Command Settings")
        .colour(Colour::BLUE)
        .fields(fields.into_iter().map(|(name, value)| (name, value, false)));

    cmd.create_response(
        &ctx.http,
        CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .embed(embed)
                .ephemeral(true),
        ),
    )
    .await?;
    Ok(())
}

/// `(name, value)` embed fields for `/markinfo`. Empty allowlists are omitted.
fn markinfo_fields(markers: &MarkerTable, access: &AccessPolicy) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = markers
        .iter()
        .map(|m| {
            let name = if m.name == DEFAULT_MARKER {
                "Current Emoji".to_string()
            } else {
                format!("/{} Emoji", m.name)
            };
            (name, m.emoji.clone())
        })
        .collect();

    let mode = if access.admin_only { "Enabled" } else { "Disabled" };
    out.push(("Admin Only Mode".to_string(), mode.to_string()));

    if !access.allowed_roles.is_empty() {
        let roles: Vec<String> = access
            .allowed_roles
            .iter()
            .map(|r| format!("<@&{}>", r.0))
            .collect();
        out.push(("Allowed Roles".to_string(), roles.join(", ")));
    }

    if !access.allowed_users.is_empty() {
        let users: Vec<String> = access
            .allowed_users
            .iter()
            .map(|u| format!("<@{}>", u.0))
            .collect();
        out.push(("Allowed Users".to_string(), users.join(", ")));
    }

    out
}
