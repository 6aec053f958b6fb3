pub mod builder;
#[cfg(test)]
mod tests;

use crate::engine::ThrottleEngine;
use crate::policy::{Scope, ThrottlePolicy};
use crate::store::{InMemoryStore, WindowStore};
use builder::ThrottleGateBuilder;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub(crate) type DeniedMessage = dyn Fn(Duration) -> String + Send + Sync;

/// One inbound command invocation, as resolved by the dispatch layer.
#[derive(Copy, Clone, Debug)]
pub struct Invocation<'a> {
    pub user_id: u64,
    pub guild_id: u64,
    pub command: &'a str,
}

impl Invocation<'_> {
    fn subject(&self, scope: Scope) -> u64 {
        match scope {
            Scope::User => self.user_id,
            Scope::Guild => self.guild_id,
        }
    }
}

/// Returned when an invocation was rejected by an attached policy.
///
/// Displays as the configured cooldown message, so it can be sent to the
/// invoking user as-is.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct Denied {
    message: String,
    remaining: Duration,
}

impl Denied {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    /// Seconds until the window resets (rounded upwards, so that it is
    /// guaranteed to be reset after waiting for the duration).
    pub fn seconds_until_reset(&self) -> u64 {
        whole_seconds(self.remaining)
    }
}

pub(crate) fn whole_seconds(remaining: Duration) -> u64 {
    (remaining.as_millis() as f64 / 1000f64).ceil() as u64
}

/// Attaches throttle policies to a unit of work.
///
/// Policies come in two granularities: group policies share one window per
/// subject across every command guarded by this gate, command policies get an
/// independent window per command name. Build one gate per command group and
/// call [ThrottleGate::run] (or [ThrottleGate::admit]) before executing the
/// command's business logic.
pub struct ThrottleGate<S: WindowStore = InMemoryStore> {
    engine: Arc<ThrottleEngine<S>>,
    group: Vec<ThrottlePolicy>,
    per_command: Vec<ThrottlePolicy>,
    denied_message: Arc<DeniedMessage>,
}

impl<S: WindowStore> Clone for ThrottleGate<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            group: self.group.clone(),
            per_command: self.per_command.clone(),
            denied_message: self.denied_message.clone(),
        }
    }
}

impl<S: WindowStore> ThrottleGate<S> {
    /// # Arguments
    ///
    /// * `engine`: The shared admission engine, usually one per process.
    pub fn builder(engine: Arc<ThrottleEngine<S>>) -> ThrottleGateBuilder<S> {
        ThrottleGateBuilder::new(engine)
    }

    /// Checks every attached policy for this invocation.
    ///
    /// All policies must admit: group policies are evaluated first, then
    /// command policies, each in attachment order. When a policy denies,
    /// admissions already granted by earlier policies in this invocation are
    /// rolled back, so a denied invocation consumes no budget anywhere.
    pub fn admit(&self, invocation: &Invocation<'_>) -> Result<(), Denied> {
        let mut granted: Vec<(ThrottlePolicy, Option<&str>)> = Vec::new();
        let checks = self
            .group
            .iter()
            .map(|policy| (*policy, None))
            .chain(
                self.per_command
                    .iter()
                    .map(|policy| (*policy, Some(invocation.command))),
            );
        for (policy, command) in checks {
            let subject = invocation.subject(policy.scope);
            if self.engine.check(&policy, subject, command).is_denied() {
                let remaining = self.engine.time_until_reset(&policy, subject, command);
                for (earlier, earlier_command) in &granted {
                    self.engine
                        .rollback(earlier, invocation.subject(earlier.scope), *earlier_command);
                }
                return Err(Denied {
                    message: (self.denied_message)(remaining),
                    remaining,
                });
            }
            granted.push((policy, command));
        }
        Ok(())
    }

    /// Runs the protected operation only if every attached policy admits the
    /// invocation.
    ///
    /// The operation closure is not even called in the denied case, so none
    /// of its side effects happen.
    pub async fn run<F, O, T>(&self, invocation: &Invocation<'_>, operation: F) -> Result<T, Denied>
    where
        F: FnOnce() -> O,
        O: Future<Output = T>,
    {
        self.admit(invocation)?;
        Ok(operation().await)
    }
}
