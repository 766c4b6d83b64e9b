//! User-facing reply text for the slash commands.

use std::time::Duration;

use crate::{errors::Error, marker::MarkAction, marker::MarkerTable, rename::RenameOutcome};

pub const NOT_A_TEXT_CHANNEL: &str = "This command can only be used in text channels!";
pub const NOT_ALLOWED: &str = "You are not allowed to use this command.";
pub const MISSING_PERMISSION: &str = "I don't have permission to edit this channel!";
pub const UNEXPECTED_FAILURE: &str = "An error occurred while processing the command.";
pub const CHECKMARK_HINT: &str = "Use `/checkmark` to check when you can modify this channel.";

/// "M minutes and S seconds", or "S seconds" under a minute. Values are floored.
pub fn format_wait(wait: Duration) -> String {
    let total = wait.as_secs();
    let minutes = total / 60;
    let seconds = total % 60;
    if minutes > 0 {
        format!("{minutes} minutes and {seconds} seconds")
    } else {
        format!("{seconds} seconds")
    }
}

pub fn mark_reply(action: MarkAction, outcome: &RenameOutcome) -> String {
    match outcome {
        RenameOutcome::Renamed => format!("Successfully {action} the emoji!"),
        RenameOutcome::Unchanged => outcome.message(),
        RenameOutcome::CooldownActive { .. } => {
            format!("⏳ {}\n{CHECKMARK_HINT}", outcome.message())
        }
        RenameOutcome::RateLimited { retry_after } => format!(
            "⚠️ This channel was edited too recently. Please wait {} before trying again.\n{CHECKMARK_HINT}",
            format_wait(*retry_after)
        ),
    }
}

pub fn mark_error_reply(err: &Error) -> String {
    match err {
        Error::PermissionDenied(_) => MISSING_PERMISSION.to_string(),
        other => format!("An error occurred: {other}"),
    }
}

pub fn checkmark_reply(eligible: bool, remaining: Duration) -> String {
    if eligible {
        return "✅ This channel can be marked now!".to_string();
    }
    format!(
        "⏳ This channel can be marked again in {}",
        format_wait(remaining)
    )
}

pub fn command_cooldown_reply(wait: Duration) -> String {
    format!(
        "This command is on cooldown. Please try again in {:.1} seconds.",
        wait.as_secs_f64()
    )
}

/// `saved` tells whether the emoji made it into the env file.
pub fn setemoji_reply(emoji: &str, saved: bool) -> String {
    let persistence = if saved {
        "The new emoji has been saved and will persist after bot restart."
    } else {
        "⚠️ The new emoji could not be saved and will be lost when the bot restarts."
    };
    format!(
        "Successfully set the mark emoji to: {emoji}\n\
Note: This will only affect new marks, existing marked channels will keep the old emoji.\n\
{persistence}"
    )
}

/// `(command, description)` pairs the requester is allowed to see in `/help`.
pub fn help_entries(markers: &MarkerTable, can_mark: bool, is_admin: bool) -> Vec<(String, String)> {
    let mut out = vec![
        ("help".to_string(), "Show this help message".to_string()),
        (
            "checkmark".to_string(),
            "Check when a channel can be marked again".to_string(),
        ),
    ];

    if can_mark {
        for m in markers.iter() {
            out.push((
                m.name.clone(),
                format!("Toggle {} in the current channel's name", m.emoji),
            ));
        }
    }

    if is_admin {
        out.push((
            "setemoji".to_string(),
            "Set a custom emoji for a marker command (Admin only)".to_string(),
        ));
        out.push((
            "markinfo".to_string(),
            "Show current mark command settings (Admin only)".to_string(),
        ));
    }

    out
}
