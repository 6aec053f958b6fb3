mod memory;

pub use memory::InMemoryStore;

use tokio::time::Instant;

/// Identifies one throttling window: a subject (user id or guild id) plus the
/// command being invoked.
///
/// Group-level policies use an empty command name, so every command in the
/// group shares a single window per subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThrottleKey {
    subject: u64,
    command: String,
}

impl ThrottleKey {
    pub fn new(subject: u64, command: Option<&str>) -> Self {
        Self {
            subject,
            command: command.unwrap_or_default().to_owned(),
        }
    }

    pub fn subject(&self) -> u64 {
        self.subject
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// One fixed window of admitted requests, anchored at the first request.
///
/// A window is always replaced wholesale, never mutated in place, so that a
/// stale copy read by a concurrent caller can be detected by value comparison.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ThrottleWindow {
    /// When the first request of this window was admitted.
    pub first_request: Instant,
    /// Requests admitted since `first_request`. Always at least 1.
    pub request_count: u64,
}

impl ThrottleWindow {
    /// A fresh window holding the single request that opened it.
    pub fn starting_at(first_request: Instant) -> Self {
        Self {
            first_request,
            request_count: 1,
        }
    }

    /// The same window with one more admitted request.
    pub fn incremented(self) -> Self {
        Self {
            first_request: self.first_request,
            request_count: self.request_count + 1,
        }
    }
}

/// A concurrent mapping from [ThrottleKey] to [ThrottleWindow].
///
/// None of the operations block, and none expose locks to the caller; all
/// consistency comes from the insert-if-absent and compare-and-swap
/// primitives, which must be atomic with respect to concurrent calls on the
/// same key. Callers resolve contention by re-reading and retrying.
pub trait WindowStore {
    /// Non-blocking read of the current window for `key`, if any.
    fn try_get(&self, key: &ThrottleKey) -> Option<ThrottleWindow>;

    /// Inserts `window` only if no entry exists for `key`.
    ///
    /// Returns false when another caller won the race to create the entry.
    fn try_insert(&self, key: ThrottleKey, window: ThrottleWindow) -> bool;

    /// Replaces the stored window with `new` only if the currently stored
    /// window is value-identical to `expected`.
    ///
    /// Returns false when the stored window changed since it was read (or the
    /// entry no longer exists); the caller should re-read and re-evaluate.
    fn try_compare_and_swap(
        &self,
        key: &ThrottleKey,
        expected: ThrottleWindow,
        new: ThrottleWindow,
    ) -> bool;

    /// Removes the entry for `key` only if the stored window is
    /// value-identical to `expected`.
    ///
    /// Used to roll back an admission that opened a fresh window.
    fn try_remove(&self, key: &ThrottleKey, expected: ThrottleWindow) -> bool;
}
