// Tests for the permission check helper
//
// Granted and denied statuses must answer synchronously; an undetermined
// status must prompt once and answer exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use voice_memo_recorder::{check_permission, PermissionAuthority, PermissionStatus, StaticAuthority};

fn as_authority(authority: &Arc<StaticAuthority>) -> Arc<dyn PermissionAuthority> {
    Arc::clone(authority) as Arc<dyn PermissionAuthority>
}

#[test]
fn test_granted_answers_synchronously() {
    let authority = Arc::new(StaticAuthority::granted());
    let calls = Arc::new(AtomicUsize::new(0));
    let answer = Arc::new(std::sync::Mutex::new(None));

    let calls_in = Arc::clone(&calls);
    let answer_in = Arc::clone(&answer);
    check_permission(&as_authority(&authority), move |granted| {
        calls_in.fetch_add(1, Ordering::SeqCst);
        *answer_in.lock().unwrap() = Some(granted);
    });

    // No runtime involved: the callback already ran
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(*answer.lock().unwrap(), Some(true));
    assert_eq!(authority.request_count(), 0);
}

#[test]
fn test_denied_answers_synchronously() {
    let authority = Arc::new(StaticAuthority::denied());
    let answer = Arc::new(std::sync::Mutex::new(None));

    let answer_in = Arc::clone(&answer);
    check_permission(&as_authority(&authority), move |granted| {
        *answer_in.lock().unwrap() = Some(granted);
    });

    assert_eq!(*answer.lock().unwrap(), Some(false));
    assert_eq!(authority.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_undetermined_prompts_and_answers_later() {
    let authority = Arc::new(
        StaticAuthority::undetermined().answer_after(Duration::from_secs(2)),
    );
    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = oneshot::channel();

    let calls_in = Arc::clone(&calls);
    check_permission(&as_authority(&authority), move |granted| {
        calls_in.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(granted);
    });

    assert_eq!(calls.load(Ordering::SeqCst), 0, "answer arrives asynchronously");

    let granted = rx.await.unwrap();
    assert!(granted);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(authority.request_count(), 1);
    assert_eq!(authority.current_status(), PermissionStatus::Granted);
}

#[tokio::test(start_paused = true)]
async fn test_undetermined_refusal_updates_status() {
    let authority = Arc::new(StaticAuthority::undetermined().answer_requests_with(false));
    let (tx, rx) = oneshot::channel();

    check_permission(&as_authority(&authority), move |granted| {
        let _ = tx.send(granted);
    });

    assert!(!rx.await.unwrap());
    assert_eq!(authority.current_status(), PermissionStatus::Denied);
}

#[test]
fn test_permission_status_serialization() {
    let json = serde_json::to_string(&PermissionStatus::Undetermined).unwrap();
    assert_eq!(json, r#""undetermined""#);
}
