use serenity::all::{
    ChannelType, CommandDataOptionValue, CommandInteraction, CommandOptionType, Context,
    CreateCommand, CreateCommandOption, GuildChannel, Permissions,
};
use tracing::warn;

use chanmark_core::{marker::MarkerTable, replies::NOT_A_TEXT_CHANNEL};

use crate::router::AppState;

use super::{admin, info, mark, respond};

/// Global slash command set: one command per marker plus the fixed ones.
///
/// In admin-only mode the marker commands are hidden from non-administrators.
pub fn definitions(markers: &MarkerTable, admin_only: bool) -> Vec<CreateCommand> {
    let mut out: Vec<CreateCommand> = markers
        .iter()
        .map(|m| {
            let def = CreateCommand::new(m.name.as_str())
                .description(format!("Toggle {} in channel name", m.emoji));
            if admin_only {
                def.default_member_permissions(Permissions::ADMINISTRATOR)
            } else {
                def
            }
        })
        .collect();

    out.push(
        CreateCommand::new("checkmark").description("Check when a channel can be marked again"),
    );
    out.push(CreateCommand::new("help").description("Show help information for all commands"));
    out.push(
        CreateCommand::new("about")
            .description("Show information about the bot and its source code"),
    );
    out.push(
        CreateCommand::new("setemoji")
            .description("Set a custom emoji for a marker command")
            .default_member_permissions(Permissions::ADMINISTRATOR)
            .add_option(
                CreateCommandOption::new(CommandOptionType::String, "emoji", "The new emoji")
                    .required(true),
            )
            .add_option(CreateCommandOption::new(
                CommandOptionType::String,
                "marker",
                "Marker command to change (defaults to mark)",
            )),
    );
    out.push(
        CreateCommand::new("markinfo")
            .description("Show current mark command settings")
            .default_member_permissions(Permissions::ADMINISTRATOR),
    );

    out
}

pub async fn handle_command(
    ctx: &Context,
    cmd: &CommandInteraction,
    state: &AppState,
) -> anyhow::Result<()> {
    match cmd.data.name.as_str() {
        "checkmark" => mark::checkmark(ctx, cmd, state).await,
        "help" => info::help(ctx, cmd, state).await,
        "about" => info::about(ctx, cmd).await,
        "setemoji" => admin::setemoji(ctx, cmd, state).await,
        "markinfo" => admin::markinfo(ctx, cmd, state).await,
        name => {
            let marker = state.markers.read().await.get(name).cloned();
            match marker {
                Some(marker) => mark::toggle(ctx, cmd, state, marker).await,
                None => {
                    // Stale registration, e.g. a marker dropped from MARKERS.
                    warn!(command = name, "unknown command");
                    respond(ctx, cmd, "Unknown command.").await?;
                    Ok(())
                }
            }
        }
    }
}

/// The invoking channel if it is a guild text or announcement channel.
/// Otherwise the user is told so and `None` is returned.
pub(crate) async fn text_channel(
    ctx: &Context,
    cmd: &CommandInteraction,
) -> anyhow::Result<Option<GuildChannel>> {
    let channel = cmd
        .channel_id
        .to_channel(ctx)
        .await?
        .guild()
        .filter(|c| is_text_kind(c.kind));

    if channel.is_none() {
        respond(ctx, cmd, NOT_A_TEXT_CHANNEL).await?;
    }
    Ok(channel)
}

fn is_text_kind(kind: ChannelType) -> bool {
    matches!(kind, ChannelType::Text | ChannelType::News)
}

pub(crate) fn string_option<'a>(cmd: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    cmd.data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| match &o.value {
            CommandDataOptionValue::String(s) => Some(s.trim()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
}
