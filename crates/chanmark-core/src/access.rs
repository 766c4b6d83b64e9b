use std::{collections::HashMap, time::Duration};

use tokio::time::Instant;

use crate::domain::{ChannelId, Requester, RoleId, UserId};

// ============== Authorization ==============

/// Who may use the marker commands.
#[derive(Clone, Debug, Default)]
pub struct AccessPolicy {
    pub admin_only: bool,
    pub allowed_roles: Vec<RoleId>,
    pub allowed_users: Vec<UserId>,
}

impl AccessPolicy {
    pub fn new(admin_only: bool, allowed_roles: &[u64], allowed_users: &[u64]) -> Self {
        Self {
            admin_only,
            allowed_roles: allowed_roles.iter().copied().map(RoleId).collect(),
            allowed_users: allowed_users.iter().copied().map(UserId).collect(),
        }
    }

    /// In admin-only mode only administrators may mark; otherwise the user
    /// must be listed directly or hold one of the listed roles.
    pub fn can_mark(&self, who: &Requester) -> bool {
        if self.admin_only {
            return who.is_admin;
        }
        self.allowed_users.contains(&who.user_id)
            || who.roles.iter().any(|r| self.allowed_roles.contains(r))
    }

    pub fn can_administer(&self, who: &Requester) -> bool {
        who.is_admin
    }
}

// ============== Command throttle (token bucket) ==============

#[derive(Clone, Debug)]
struct Bucket {
    tokens: f64,
    last_update: Instant,
}

/// Spam guard in front of the marker commands, keyed by channel.
///
/// Independent of the rename cooldown: it only stops a burst of invocations
/// from queueing up on the channel lock.
#[derive(Clone, Debug)]
pub struct CommandThrottle {
    enabled: bool,
    max_tokens: f64,
    refill_per_sec: f64,
    buckets: HashMap<ChannelId, Bucket>,
}

impl CommandThrottle {
    /// Allow `max_calls` per `window` for each channel. A zero window disables throttling.
    pub fn new(max_calls: u32, window: Duration) -> Self {
        let max_tokens = f64::from(max_calls.max(1));
        let window_secs = window.as_secs_f64().max(1e-9);

        Self {
            enabled: !window.is_zero(),
            max_tokens,
            refill_per_sec: max_tokens / window_secs,
            buckets: HashMap::new(),
        }
    }

    pub fn check(&mut self, channel_id: ChannelId) -> (bool, Option<Duration>) {
        self.check_at(channel_id, Instant::now())
    }

    pub fn check_at(&mut self, channel_id: ChannelId, now: Instant) -> (bool, Option<Duration>) {
        if !self.enabled {
            return (true, None);
        }

        let bucket = self.buckets.entry(channel_id).or_insert_with(|| Bucket {
            tokens: self.max_tokens,
            last_update: now,
        });

        let elapsed = now.duration_since(bucket.last_update).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        bucket.last_update = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return (true, None);
        }

        let secs = (1.0 - bucket.tokens) / self.refill_per_sec;
        (false, Some(Duration::from_secs_f64(secs.max(0.0))))
    }
}
