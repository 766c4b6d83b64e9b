use serenity::all::{
    Colour, CommandInteraction, Context, CreateEmbed, CreateEmbedFooter,
    CreateInteractionResponse, CreateInteractionResponseMessage,
};

use chanmark_core::{config::GITHUB_LINK, replies::help_entries};

use crate::router::AppState;

use super::requester;

pub(super) async fn help(
    ctx: &Context,
    cmd: &CommandInteraction,
    state: &AppState,
) -> anyhow::Result<()> {
    let who = requester(cmd);
    let entries = {
        let markers = state.markers.read().await;
        help_entries(
            &markers,
            state.access.can_mark(&who),
            state.access.can_administer(&who),
        )
    };

    let embed = CreateEmbed::new()
        .title("Channel Marker Bot Help")
        .description(format!(
            "A bot that helps manage channel markers with emojis\n\n🔗 [View Source Code]({GITHUB_LINK})"
        ))
        .colour(Colour::BLUE)
        .fields(
            entries
                .into_iter()
                .map(|(name, desc)| (format!("/{name}"), desc, false)),
        )
        .footer(CreateEmbedFooter::new(
            "Bot is open source! Check out the GitHub repository for more info.",
        ));

    send_embed(ctx, cmd, embed, true).await
}

pub(super) async fn about(ctx: &Context, cmd: &CommandInteraction) -> anyhow::Result<()> {
    send_embed(ctx, cmd, about_embed(), false).await
}

fn about_embed() -> CreateEmbed {
    CreateEmbed::new()
        .title("About Discord To-Do Bot")
        .url(GITHUB_LINK)
        .description(format!(
            "I'm a bot that helps manage channel markers with emojis.\n\n\
📖 **Source Code**\n\
This bot is open source! Check out the [GitHub Repository]({GITHUB_LINK})\n\n\
🌟 **Features**\n\
• Mark channels with custom emojis\n\
• Role-based permissions\n\
• Admin controls\n\
• Rate limit handling"
        ))
        .colour(Colour::BLUE)
        .footer(CreateEmbedFooter::new("Created by GlizzyKingDreko"))
}

async fn send_embed(
    ctx: &Context,
    cmd: &CommandInteraction,
    embed: CreateEmbed,
    ephemeral: bool,
) -> anyhow::Result<()> {
    cmd.create_response(
        &ctx.http,
        CreateInteractionResponse::Message(
            CreateInteractionResponseMessage::new()
                .embed(embed)
                .ephemeral(ephemeral),
        ),
    )
    .await?;
    Ok(())
}
