use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::time::Instant;

use crate::domain::ChannelId;

/// Minimum spacing between two successful renames of the same channel.
///
/// Discord allows two channel name edits per ten minutes; one rename per
/// window keeps us well clear of the hidden per-channel bucket.
pub const CHANNEL_COOLDOWN: Duration = Duration::from_secs(600);

/// Last successful modification per channel.
///
/// An entry only exists once a rename has succeeded; a missing entry means the
/// channel is immediately eligible. Entries live for the whole process.
#[derive(Debug)]
pub struct CooldownLedger {
    window: Duration,
    last_modified: Mutex<HashMap<ChannelId, Instant>>,
}

impl Default for CooldownLedger {
    fn default() -> Self {
        Self::new(CHANNEL_COOLDOWN)
    }
}

impl CooldownLedger {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_modified: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether `channel_id` may be renamed now, and how long until it may if not.
    pub fn can_modify(&self, channel_id: ChannelId) -> (bool, Duration) {
        self.can_modify_at(channel_id, Instant::now())
    }

    pub fn can_modify_at(&self, channel_id: ChannelId, now: Instant) -> (bool, Duration) {
        let Some(last) = self.entries().get(&channel_id).copied() else {
            return (true, Duration::ZERO);
        };

        let cooldown_end = last + self.window;
        if now >= cooldown_end {
            return (true, Duration::ZERO);
        }
        (false, cooldown_end.duration_since(now))
    }

    pub fn record_modification(&self, channel_id: ChannelId) {
        self.record_modification_at(channel_id, Instant::now());
    }

    pub fn record_modification_at(&self, channel_id: ChannelId, now: Instant) {
        self.entries().insert(channel_id, now);
    }

    pub fn last_modified(&self, channel_id: ChannelId) -> Option<Instant> {
        self.entries().get(&channel_id).copied()
    }

    // Never held across an await; a poisoned map is still a valid map.
    fn entries(&self) -> MutexGuard<'_, HashMap<ChannelId, Instant>> {
        self.last_modified
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
