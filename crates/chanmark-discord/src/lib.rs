//! Discord adapter.
//!
//! Slash commands arrive over the serenity gateway; the channel rename itself
//! goes through [`DiscordRenamer`], a plain REST client implementing the
//! `chanmark-core` [`ChannelRenamer`] port.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, AUTHORIZATION},
    StatusCode,
};
use serde::{Deserialize, Serialize};

pub mod handlers;
pub mod router;

use chanmark_core::{
    config::GITHUB_LINK,
    domain::ChannelId,
    errors::Error,
    ports::{ChannelRenamer, RenameError},
    Result,
};

const API_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Renames channels with `PATCH /channels/{id}`.
///
/// serenity's HTTP client waits out 429s internally, which for the per-channel
/// rename bucket can mean minutes spent holding the channel lock. This client
/// hands the 429 back instead so the guard can report it.
#[derive(Clone, Debug)]
pub struct DiscordRenamer {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Serialize)]
struct RenameBody<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl DiscordRenamer {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .user_agent(format!(
                "DiscordBot ({GITHUB_LINK}, {})",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| Error::External(format!("reqwest client build: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn channel_url(&self, channel_id: ChannelId) -> String {
        format!("{}/channels/{}", self.api_base, channel_id.0)
    }
}

#[async_trait]
impl ChannelRenamer for DiscordRenamer {
    async fn rename_channel(
        &self,
        channel_id: ChannelId,
        name: &str,
    ) -> std::result::Result<(), RenameError> {
        let resp = self
            .http
            .patch(self.channel_url(channel_id))
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .json(&RenameBody { name })
            .send()
            .await
            .map_err(|e| Error::External(format!("discord request error: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let headers = resp.headers().clone();
        let body = resp.text().await.unwrap_or_default();
        Err(classify_failure(status, &headers, &body))
    }
}

fn classify_failure(status: StatusCode, headers: &HeaderMap, body: &str) -> RenameError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => RenameError::RateLimited {
            retry_after: retry_after(headers, body),
        },
        StatusCode::FORBIDDEN => {
            let message = serde_json::from_str::<ErrorBody>(body)
                .map(|b| b.message)
                .unwrap_or_else(|_| "Missing Permissions".to_string());
            RenameError::Failed(Error::PermissionDenied(message))
        }
        _ => RenameError::Failed(Error::External(format!(
            "discord rename failed: {status} {}",
            body.chars().take(200).collect::<String>()
        ))),
    }
}

/// Server-requested wait: JSON `retry_after`, then `X-RateLimit-Reset-After`,
/// then `Retry-After`, all in (fractional) seconds.
fn retry_after(headers: &HeaderMap, body: &str) -> Duration {
    serde_json::from_str::<RateLimitBody>(body)
        .ok()
        .map(|b| b.retry_after)
        .or_else(|| header_secs(headers, "x-ratelimit-reset-after"))
        .or_else(|| header_secs(headers, "retry-after"))
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

fn header_secs(headers: &HeaderMap, name: &str) -> Option<f64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
}
