//! Per-channel rename guard.
//!
//! Serializes renames per channel, enforces the cooldown window under the
//! channel lock and turns platform rate limiting into a reportable outcome.

use std::{future::Future, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    cooldown::CooldownLedger,
    domain::ChannelId,
    locks::ChannelLocks,
    ports::{ChannelRenamer, RenameError},
    replies::format_wait,
    Result,
};

/// Result of one rename attempt that did not fail outright.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The channel already had the desired name; nothing was done.
    Unchanged,
    Renamed,
    CooldownActive { remaining: Duration },
    RateLimited { retry_after: Duration },
}

impl RenameOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Unchanged | Self::Renamed)
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::CooldownActive { remaining } => Some(*remaining),
            Self::RateLimited { retry_after } => Some(*retry_after),
            Self::Unchanged | Self::Renamed => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Unchanged => "Channel name is already in desired state.".to_string(),
            Self::Renamed => "Successfully modified channel name.".to_string(),
            Self::CooldownActive { remaining } => format!(
                "Channel was modified too recently. Please wait {}.",
                format_wait(*remaining)
            ),
            Self::RateLimited { retry_after } => format!(
                "Rate limit reached. Please wait {}.",
                format_wait(*retry_after)
            ),
        }
    }
}

/// Owns the cooldown ledger and the channel lock registry.
///
/// Built once at startup and shared by every command invocation.
#[derive(Debug, Default)]
pub struct RenameGuard {
    ledger: CooldownLedger,
    locks: ChannelLocks,
}

impl RenameGuard {
    pub fn ledger(&self) -> &CooldownLedger {
        &self.ledger
    }

    pub fn locks(&self) -> &ChannelLocks {
        &self.locks
    }

    pub fn can_modify(&self, channel_id: ChannelId) -> (bool, Duration) {
        self.ledger.can_modify(channel_id)
    }

    /// Rename `channel_id` from `current_name` to `desired_name` via `rename_fn`.
    ///
    /// Rate limiting and an active cooldown come back as `Ok` outcomes; any
    /// other failure of `rename_fn` is returned as `Err` untouched. The ledger is
    /// only updated after a successful call.
    pub async fn attempt_rename<F, Fut>(
        &self,
        channel_id: ChannelId,
        current_name: &str,
        desired_name: &str,
        rename_fn: F,
    ) -> Result<RenameOutcome>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = std::result::Result<(), RenameError>>,
    {
        if desired_name == current_name {
            debug!(channel = %channel_id, "rename skipped: name unchanged");
            return Ok(RenameOutcome::Unchanged);
        }

        let _guard = self.locks.lock(channel_id).await;

        // A check made before the lock was granted may be stale: the previous
        // holder could have just renamed this channel.
        let (eligible, remaining) = self.ledger.can_modify(channel_id);
        if !eligible {
            debug!(
                channel = %channel_id,
                remaining_secs = remaining.as_secs(),
                "rename rejected: cooldown"
            );
            return Ok(RenameOutcome::CooldownActive { remaining });
        }

        match rename_fn(desired_name.to_string()).await {
            Ok(()) => {
                self.ledger.record_modification(channel_id);
                info!(channel = %channel_id, name = desired_name, "channel renamed");
                Ok(RenameOutcome::Renamed)
            }
            Err(RenameError::RateLimited { retry_after }) => {
                warn!(
                    channel = %channel_id,
                    retry_after_secs = retry_after.as_secs_f64(),
                    "rename rate limited by platform"
                );
                Ok(RenameOutcome::RateLimited { retry_after })
            }
            Err(RenameError::Failed(e)) => Err(e),
        }
    }

    /// [`RenameGuard::attempt_rename`] with a [`ChannelRenamer`] as the rename call.
    pub async fn attempt_rename_with(
        &self,
        renamer: &dyn ChannelRenamer,
        channel_id: ChannelId,
        current_name: &str,
        desired_name: &str,
    ) -> Result<RenameOutcome> {
        self.attempt_rename(channel_id, current_name, desired_name, |name| async move {
            renamer.rename_channel(channel_id, &name).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cooldown::CHANNEL_COOLDOWN, errors::Error};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const CH: ChannelId = ChannelId(1001);

    enum Script {
        Ok,
        RateLimited(Duration),
        Forbidden,
    }

    struct FakeRenamer {
        script: Script,
        delay: Duration,
        calls: AtomicUsize,
        names: Mutex<Vec<String>>,
    }

    impl FakeRenamer {
        fn new(script: Script) -> Self {
            Self {
                script,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                names: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChannelRenamer for FakeRenamer {
        async fn rename_channel(
            &self,
            _channel_id: ChannelId,
            name: &str,
        ) -> std::result::Result<(), RenameError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.names.lock().unwrap().push(name.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.script {
                Script::Ok => Ok(()),
                Script::RateLimited(d) => Err(RenameError::RateLimited { retry_after: *d }),
                Script::Forbidden => Err(RenameError::Failed(Error::PermissionDenied(
                    "Missing Permissions".to_string(),
                ))),
            }
        }
    }

    async fn must_not_rename(_name: String) -> std::result::Result<(), RenameError> {
        panic!("rename_fn must not be called for a no-op");
    }

    #[tokio::test(start_paused = true)]
    async fn first_rename_succeeds_and_starts_cooldown() {
        let guard = RenameGuard::default();
        let renamer = FakeRenamer::new(Script::Ok);

        let out = guard
            .attempt_rename_with(&renamer, CH, "general", "✅-general")
            .await
            .unwrap();

        assert_eq!(out, RenameOutcome::Renamed);
        assert!(out.is_success());
        assert_eq!(out.retry_after(), None);
        assert_eq!(*renamer.names.lock().unwrap(), vec!["✅-general".to_string()]);
        assert_eq!(guard.can_modify(CH), (false, CHANNEL_COOLDOWN));
    }

    #[tokio::test(start_paused = true)]
    async fn renaming_back_within_window_reports_cooldown_without_calling_out() {
        let guard = RenameGuard::default();
        let renamer = FakeRenamer::new(Script::Ok);

        guard
            .attempt_rename_with(&renamer, CH, "general", "✅-general")
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;

        let out = guard
            .attempt_rename_with(&renamer, CH, "✅-general", "general")
            .await
            .unwrap();

        assert_eq!(
            out,
            RenameOutcome::CooldownActive {
                remaining: Duration::from_secs(597)
            }
        );
        assert!(!out.is_success());
        assert_eq!(out.retry_after(), Some(Duration::from_secs(597)));
        assert_eq!(
            out.message(),
            "Channel was modified too recently. Please wait 9 minutes and 57 seconds."
        );
        assert_eq!(renamer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rename_allowed_again_once_window_elapses() {
        let guard = RenameGuard::default();
        let renamer = FakeRenamer::new(Script::Ok);

        guard
            .attempt_rename_with(&renamer, CH, "general", "✅-general")
            .await
            .unwrap();
        tokio::time::advance(CHANNEL_COOLDOWN).await;

        let out = guard
            .attempt_rename_with(&renamer, CH, "✅-general", "general")
            .await
            .unwrap();
        assert_eq!(out, RenameOutcome::Renamed);
        assert_eq!(renamer.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_is_reported_and_does_not_touch_the_ledger() {
        let guard = RenameGuard::default();
        let renamer = FakeRenamer::new(Script::RateLimited(Duration::from_millis(12_500)));

        let out = guard
            .attempt_rename_with(&renamer, CH, "general", "✅-general")
            .await
            .unwrap();

        assert_eq!(
            out,
            RenameOutcome::RateLimited {
                retry_after: Duration::from_millis(12_500)
            }
        );
        assert_eq!(out.retry_after(), Some(Duration::from_millis(12_500)));
        assert_eq!(out.message(), "Rate limit reached. Please wait 12 seconds.");
        assert_eq!(guard.can_modify(CH), (true, Duration::ZERO));
        assert!(guard.ledger().last_modified(CH).is_none());
    }

    #[tokio::test]
    async fn other_failures_propagate_and_release_the_lock() {
        let guard = RenameGuard::default();
        let renamer = FakeRenamer::new(Script::Forbidden);

        let err = guard
            .attempt_rename_with(&renamer, CH, "general", "✅-general")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PermissionDenied(_)));
        assert_eq!(guard.can_modify(CH), (true, Duration::ZERO));
        assert!(guard.locks().try_lock(CH).await.is_some());
    }

    #[tokio::test]
    async fn equal_names_never_lock_call_or_record() {
        let guard = RenameGuard::default();
        let held = guard.locks().lock(CH).await;

        let out = tokio::time::timeout(
            Duration::from_secs(1),
            guard.attempt_rename(CH, "general", "general", must_not_rename),
        )
        .await
        .expect("no-op must not wait for the channel lock")
        .unwrap();

        assert_eq!(out, RenameOutcome::Unchanged);
        assert!(out.is_success());
        assert_eq!(out.message(), "Channel name is already in desired state.");
        assert!(guard.ledger().last_modified(CH).is_none());
        drop(held);
    }

    #[tokio::test(start_paused = true)]
    async fn names_differing_only_in_case_are_not_a_no_op() {
        let guard = RenameGuard::default();
        let renamer = FakeRenamer::new(Script::Ok);

        let out = guard
            .attempt_rename_with(&renamer, CH, "General", "general")
            .await
            .unwrap();
        assert_eq!(out, RenameOutcome::Renamed);
        assert_eq!(renamer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_attempts_rename_only_once() {
        let guard = RenameGuard::default();
        let renamer = FakeRenamer::new(Script::Ok).with_delay(Duration::from_millis(250));

        let (a, b) = tokio::join!(
            guard.attempt_rename_with(&renamer, CH, "general", "✅-general"),
            guard.attempt_rename_with(&renamer, CH, "general", "✅-general"),
        );
        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| o.is_success());

        assert_eq!(renamer.calls(), 1);
        assert_eq!(
            outcomes[0],
            RenameOutcome::CooldownActive {
                remaining: CHANNEL_COOLDOWN
            }
        );
        assert_eq!(outcomes[1], RenameOutcome::Renamed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_attempts_across_threads_rename_only_once() {
        let guard = Arc::new(RenameGuard::default());
        let renamer = Arc::new(FakeRenamer::new(Script::Ok).with_delay(Duration::from_millis(20)));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let guard = guard.clone();
            let renamer = renamer.clone();
            tasks.push(tokio::spawn(async move {
                guard
                    .attempt_rename_with(renamer.as_ref(), CH, "general", "✅-general")
                    .await
                    .unwrap()
            }));
        }

        let mut renamed = 0;
        for t in tasks {
            match t.await.unwrap() {
                RenameOutcome::Renamed => renamed += 1,
                RenameOutcome::CooldownActive { .. } => {}
                other => panic!("unexpected outcome: {other:?}"),
            }
        }

        assert_eq!(renamed, 1);
        assert_eq!(renamer.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_attempt_releases_the_lock() {
        let guard = Arc::new(RenameGuard::default());

        let task = {
            let guard = guard.clone();
            tokio::spawn(async move {
                guard
                    .attempt_rename(CH, "general", "✅-general", |_name| async {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok::<(), RenameError>(())
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(guard.locks().try_lock(CH).await.is_none());

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(guard.locks().try_lock(CH).await.is_some());
        assert_eq!(guard.can_modify(CH), (true, Duration::ZERO));
    }
}
