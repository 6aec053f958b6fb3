use crate::engine::ThrottleEngine;
use crate::gate::{whole_seconds, DeniedMessage, ThrottleGate};
use crate::policy::ThrottlePolicy;
use crate::store::{InMemoryStore, WindowStore};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

static DEFAULT_DENIED_MESSAGE: Lazy<Arc<DeniedMessage>> = Lazy::new(|| {
    Arc::new(|remaining: Duration| {
        format!(
            "This command is on cooldown. Try again in **{}s**.",
            whole_seconds(remaining)
        )
    })
});

pub struct ThrottleGateBuilder<S: WindowStore = InMemoryStore> {
    engine: Arc<ThrottleEngine<S>>,
    group: Vec<ThrottlePolicy>,
    per_command: Vec<ThrottlePolicy>,
    denied_message: Arc<DeniedMessage>,
}

impl<S: WindowStore> ThrottleGateBuilder<S> {
    pub(super) fn new(engine: Arc<ThrottleEngine<S>>) -> Self {
        Self {
            engine,
            group: Vec::new(),
            per_command: Vec::new(),
            denied_message: DEFAULT_DENIED_MESSAGE.clone(),
        }
    }

    /// Attaches a policy shared by every command guarded by this gate.
    ///
    /// All of them draw on one window per subject, keyed by the empty command
    /// name.
    pub fn group(mut self, policy: ThrottlePolicy) -> Self {
        self.group.push(policy);
        self
    }

    /// Attaches a policy with an independent window per command name, per
    /// subject.
    pub fn command(mut self, policy: ThrottlePolicy) -> Self {
        self.per_command.push(policy);
        self
    }

    /// Overrides the message carried by [Denied](crate::gate::Denied) when an
    /// invocation is rejected.
    ///
    /// The function receives the remaining cooldown of the policy that
    /// denied. Defaults to a short notice with the wait rounded up to whole
    /// seconds.
    pub fn denied_message<M>(mut self, message: M) -> Self
    where
        M: Fn(Duration) -> String + Send + Sync + 'static,
    {
        self.denied_message = Arc::new(message);
        self
    }

    pub fn build(self) -> ThrottleGate<S> {
        ThrottleGate {
            engine: self.engine,
            group: self.group,
            per_command: self.per_command,
            denied_message: self.denied_message,
        }
    }
}
