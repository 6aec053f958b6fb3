use crate::policy::{Scope, ThrottlePolicy};
use crate::store::{InMemoryStore, ThrottleKey, ThrottleWindow, WindowStore};
use std::time::Duration;
use tokio::time::Instant;

/// Passes of the read-decide-swap cycle before a contended check gives up.
///
/// A lost compare-and-swap means another caller mutated the window, and a
/// window of limit L can only be mutated L times before every remaining
/// reader sees it full, so any cap above typical limits converges; the cap
/// exists to rule out livelock under pathological contention.
const CAS_RETRY_LIMIT: u32 = 8;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn is_denied(self) -> bool {
        matches!(self, Self::Denied)
    }
}

/// Fixed-window admission engine.
///
/// Owns two independent [WindowStore] partitions, one for user-scoped and one
/// for guild-scoped windows, so numerically identical user and guild ids never
/// collide. Construct once at startup and share behind an
/// [Arc](std::sync::Arc); all methods take `&self` and are safe under
/// unsynchronized concurrent access.
pub struct ThrottleEngine<S: WindowStore = InMemoryStore> {
    user_windows: S,
    guild_windows: S,
}

impl ThrottleEngine<InMemoryStore> {
    pub fn new() -> Self {
        Self::with_stores(InMemoryStore::new(), InMemoryStore::new())
    }
}

impl Default for ThrottleEngine<InMemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: WindowStore> ThrottleEngine<S> {
    pub fn with_stores(user_windows: S, guild_windows: S) -> Self {
        Self {
            user_windows,
            guild_windows,
        }
    }

    fn partition(&self, scope: Scope) -> &S {
        match scope {
            Scope::User => &self.user_windows,
            Scope::Guild => &self.guild_windows,
        }
    }

    /// Decides whether one more request from `subject` is admitted under
    /// `policy`, counting it if so.
    ///
    /// `command` is the invoked command's name for a command-level policy, or
    /// [None] for a group-level policy whose window is shared across the
    /// group.
    ///
    /// Contention on the same key is resolved by re-reading and retrying;
    /// every lost swap means a concurrent caller made progress, so the
    /// sequence of accepted replacements of one window forms a total order
    /// and the count can never pass the limit. If the retry cap is somehow
    /// exhausted the request is denied rather than admitted unchecked.
    pub fn check(&self, policy: &ThrottlePolicy, subject: u64, command: Option<&str>) -> Decision {
        let store = self.partition(policy.scope);
        let key = ThrottleKey::new(subject, command);
        for _ in 0..CAS_RETRY_LIMIT {
            let now = Instant::now();
            let Some(window) = store.try_get(&key) else {
                // First request for this key opens a fresh window
                if store.try_insert(key.clone(), ThrottleWindow::starting_at(now)) {
                    return Decision::Allowed;
                }
                // Lost the insert race; evaluate the winner's window next pass
                continue;
            };
            if now.saturating_duration_since(window.first_request) > policy.interval {
                // Window expired; whoever swaps in the fresh window is admitted
                if store.try_compare_and_swap(&key, window, ThrottleWindow::starting_at(now)) {
                    return Decision::Allowed;
                }
            } else if window.request_count < policy.limit {
                if store.try_compare_and_swap(&key, window, window.incremented()) {
                    return Decision::Allowed;
                }
            } else {
                log::debug!(
                    "throttled subject {} on {:?} ({}/{} within window)",
                    subject,
                    key.command(),
                    window.request_count,
                    policy.limit
                );
                return Decision::Denied;
            }
        }
        log::warn!(
            "admission check for subject {} exhausted {} retries under contention, denying",
            subject,
            CAS_RETRY_LIMIT
        );
        Decision::Denied
    }

    /// Remaining time until the subject's current window expires.
    ///
    /// Zero if no window exists or it has already expired. Purely
    /// informational: the value can be briefly stale relative to a
    /// concurrently advancing window.
    pub fn time_until_reset(
        &self,
        policy: &ThrottlePolicy,
        subject: u64,
        command: Option<&str>,
    ) -> Duration {
        let key = ThrottleKey::new(subject, command);
        match self.partition(policy.scope).try_get(&key) {
            Some(window) => {
                let elapsed = Instant::now().saturating_duration_since(window.first_request);
                policy.interval.saturating_sub(elapsed)
            }
            None => Duration::ZERO,
        }
    }

    /// Returns one previously admitted request to the subject's budget.
    ///
    /// Used when an invocation was admitted by this policy but denied by a
    /// later one, so the denied invocation ends up consuming nothing. Rolling
    /// back the sole request of a window removes the window entirely.
    pub fn rollback(&self, policy: &ThrottlePolicy, subject: u64, command: Option<&str>) {
        let store = self.partition(policy.scope);
        let key = ThrottleKey::new(subject, command);
        for _ in 0..CAS_RETRY_LIMIT {
            match store.try_get(&key) {
                None => return,
                Some(window) if window.request_count <= 1 => {
                    if store.try_remove(&key, window) {
                        return;
                    }
                }
                Some(window) => {
                    let restored = ThrottleWindow {
                        first_request: window.first_request,
                        request_count: window.request_count - 1,
                    };
                    if store.try_compare_and_swap(&key, window, restored) {
                        return;
                    }
                }
            }
        }
        log::warn!(
            "rollback for subject {} exhausted {} retries under contention",
            subject,
            CAS_RETRY_LIMIT
        );
    }
}
