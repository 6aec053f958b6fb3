use crate::gate::{Invocation, ThrottleGate};
use crate::policy::{Scope, ThrottlePolicy};
use crate::ThrottleEngine;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);

fn invocation(user_id: u64, guild_id: u64, command: &str) -> Invocation<'_> {
    Invocation {
        user_id,
        guild_id,
        command,
    }
}

#[tokio::test(start_paused = true)]
async fn test_allow_then_deny() {
    let engine = Arc::new(ThrottleEngine::new());
    let gate = ThrottleGate::builder(engine)
        .command(ThrottlePolicy::new(Scope::User, 1, MINUTE))
        .build();
    let calls = AtomicU64::new(0);
    let inv = invocation(1, 10, "steal");

    let result = gate
        .run(&inv, || async {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .await;
    assert!(result.is_ok());

    let result = gate
        .run(&inv, || async {
            calls.fetch_add(1, Ordering::SeqCst);
        })
        .await;
    assert!(result.is_err());
    // The protected operation never ran for the denied invocation
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_default_denied_message() {
    let engine = Arc::new(ThrottleEngine::new());
    let gate = ThrottleGate::builder(engine)
        .command(ThrottlePolicy::new(Scope::User, 1, MINUTE))
        .build();
    let inv = invocation(1, 10, "steal");

    gate.admit(&inv).unwrap();
    let denied = gate.admit(&inv).unwrap_err();
    assert_eq!(denied.seconds_until_reset(), 60);
    assert_eq!(denied.remaining(), MINUTE);
    assert_eq!(
        denied.message(),
        "This command is on cooldown. Try again in **60s**."
    );
    // Display matches the message, so the error can be sent to the user as-is
    assert_eq!(denied.to_string(), denied.message());
}

#[tokio::test(start_paused = true)]
async fn test_custom_denied_message() {
    let engine = Arc::new(ThrottleEngine::new());
    let gate = ThrottleGate::builder(engine)
        .command(ThrottlePolicy::new(Scope::Guild, 1, MINUTE))
        .denied_message(|remaining| format!("wait {}ms", remaining.as_millis()))
        .build();
    let inv = invocation(1, 10, "ranking");

    gate.admit(&inv).unwrap();
    tokio::time::advance(Duration::from_secs(30)).await;
    let denied = gate.admit(&inv).unwrap_err();
    assert_eq!(denied.message(), "wait 30000ms");
}

#[tokio::test(start_paused = true)]
async fn test_group_window_shared_across_commands() {
    let engine = Arc::new(ThrottleEngine::new());
    let gate = ThrottleGate::builder(engine)
        .group(ThrottlePolicy::new(Scope::User, 1, MINUTE))
        .build();

    assert!(gate.admit(&invocation(1, 10, "steal")).is_ok());
    // Same user, different command, same group window
    assert!(gate.admit(&invocation(1, 10, "ranking")).is_err());
    // Another user is unaffected
    assert!(gate.admit(&invocation(2, 10, "steal")).is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_command_windows_independent() {
    let engine = Arc::new(ThrottleEngine::new());
    let gate = ThrottleGate::builder(engine)
        .command(ThrottlePolicy::new(Scope::User, 1, MINUTE))
        .build();

    assert!(gate.admit(&invocation(1, 10, "steal")).is_ok());
    assert!(gate.admit(&invocation(1, 10, "ranking")).is_ok());
    assert!(gate.admit(&invocation(1, 10, "steal")).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_all_policies_must_pass() {
    let engine = Arc::new(ThrottleEngine::new());
    // Guild-wide cap of 2 across the group, plus 1 per user per command
    let gate = ThrottleGate::builder(engine)
        .group(ThrottlePolicy::new(Scope::Guild, 2, MINUTE))
        .command(ThrottlePolicy::new(Scope::User, 1, MINUTE))
        .build();

    assert!(gate.admit(&invocation(1, 10, "steal")).is_ok());
    // Denied by the per-user policy; the group admission is rolled back,
    // leaving one of the guild's two slots still free for user 2
    assert!(gate.admit(&invocation(1, 10, "steal")).is_err());
    assert!(gate.admit(&invocation(2, 10, "steal")).is_ok());
    // The guild window is now full, denying a third user
    assert!(gate.admit(&invocation(3, 10, "steal")).is_err());
    // An unrelated guild is unaffected
    assert!(gate.admit(&invocation(3, 11, "steal")).is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_denied_invocation_consumes_no_budget() {
    let engine = Arc::new(ThrottleEngine::new());
    let gate = ThrottleGate::builder(Arc::clone(&engine))
        .group(ThrottlePolicy::new(Scope::Guild, 5, MINUTE))
        .command(ThrottlePolicy::new(Scope::User, 1, MINUTE))
        .build();

    gate.admit(&invocation(1, 10, "steal")).unwrap();
    for _ in 0..3 {
        gate.admit(&invocation(1, 10, "steal")).unwrap_err();
    }
    // Only the one admitted invocation counts against the guild window
    let group = ThrottlePolicy::new(Scope::Guild, 5, MINUTE);
    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(
        engine.time_until_reset(&group, 10, None),
        MINUTE - Duration::from_secs(1)
    );
    for _ in 0..4 {
        assert!(engine.check(&group, 10, None).is_allowed());
    }
    assert!(engine.check(&group, 10, None).is_denied());
}
