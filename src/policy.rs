use std::time::Duration;

/// The identity axis a throttle counts against.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Scope {
    /// One window per user.
    User,
    /// One window per guild, shared by everyone in it.
    Guild,
}

/// How often a subject may invoke a protected operation.
///
/// Declared once per protected command or command group and never mutated.
#[derive(Copy, Clone, Debug)]
pub struct ThrottlePolicy {
    /// Whether requests are counted per user or per guild.
    pub scope: Scope,
    /// The total requests to be allowed within the interval.
    pub limit: u64,
    /// The fixed window length.
    pub interval: Duration,
}

impl ThrottlePolicy {
    /// # Panics
    ///
    /// A zero limit or zero interval is a defect in the policy declaration,
    /// not a runtime condition, and panics immediately.
    pub fn new(scope: Scope, limit: u64, interval: Duration) -> Self {
        assert!(limit > 0, "throttle limit must be non-zero");
        assert!(!interval.is_zero(), "throttle interval must be non-zero");
        Self {
            scope,
            limit,
            interval,
        }
    }
}
