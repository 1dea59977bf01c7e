mod common;

use common::*;
use raftwarden::{ensure_election_timeout, next_election_step, ParseError, ReconcileError};

#[test]
fn test_next_step_within_doubling_bound() {
    assert_eq!(next_election_step(1500, 2000), 2000);
}

#[test]
fn test_next_step_clamped_to_double() {
    assert_eq!(next_election_step(1500, 5000), 3000);
}

#[test]
fn test_next_step_when_equal() {
    assert_eq!(next_election_step(1000, 1000), 1000);
}

#[test]
fn test_next_step_within_halving_bound() {
    assert_eq!(next_election_step(2000, 1500), 1500);
}

#[test]
fn test_next_step_clamped_to_half() {
    assert_eq!(next_election_step(10000, 3000), 5000);
}

#[test]
fn test_next_step_makes_progress_from_degenerate_current() {
    assert_eq!(next_election_step(0, 2000), 2);
    assert_eq!(next_election_step(1, 2000), 2);
    assert_eq!(next_election_step(-5, 2000), 2);
}

#[tokio::test]
async fn test_leader_steps_up_from_zero_timer() {
    let channel = MockChannel::new();
    channel.ok(
        &["cluster/status", "Northbound"],
        &status_report(SERVER_ADDRESS, "leader", "0", SERVERS),
    );
    channel.ok(
        &["cluster/change-election-timer", "Northbound", "2"],
        "change of election timer initiated",
    );
    let mut db = test_db(channel.clone());
    db.election_timer = 2000;

    ensure_election_timeout(&db).await.unwrap();
    assert_eq!(
        channel.calls_matching("cluster/change-election-timer"),
        vec!["cluster/change-election-timer Northbound 2".to_string()]
    );
}

#[tokio::test]
async fn test_status_query_failure_surfaces() {
    let channel = MockChannel::new();
    channel.fail(&["cluster/status", "Northbound"], "failure");
    let db = test_db(channel.clone());

    let err = ensure_election_timeout(&db).await.unwrap_err();
    assert!(err.to_string().contains("unable to obtain cluster status"));
}

#[tokio::test]
async fn test_unparsable_timer_is_a_distinct_error_and_no_command() {
    let channel = MockChannel::new();
    channel.ok(
        &["cluster/status", "Northbound"],
        &status_report(SERVER_ADDRESS, "leader", "a", SERVERS),
    );
    let db = test_db(channel.clone());

    let err = ensure_election_timeout(&db).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::Parse(ParseError::ElectionTimer(_))
    ));
    assert!(channel
        .calls_matching("cluster/change-election-timer")
        .is_empty());
}

#[tokio::test]
async fn test_follower_never_changes_the_timer() {
    let channel = MockChannel::new();
    channel.ok(
        &["cluster/status", "Northbound"],
        &status_report(SERVER_ADDRESS, "follower", "10000", SERVERS),
    );
    let mut db = test_db(channel.clone());
    db.election_timer = 1000;

    ensure_election_timeout(&db).await.unwrap();
    assert!(channel
        .calls_matching("cluster/change-election-timer")
        .is_empty());
}

#[tokio::test]
async fn test_leader_with_timer_at_target_is_a_noop() {
    let channel = MockChannel::new();
    channel.ok(
        &["cluster/status", "Northbound"],
        &status_report(SERVER_ADDRESS, "leader", "1000", SERVERS),
    );
    let mut db = test_db(channel.clone());
    db.election_timer = 1000;

    ensure_election_timeout(&db).await.unwrap();
    assert!(channel
        .calls_matching("cluster/change-election-timer")
        .is_empty());
}

#[tokio::test]
async fn test_leader_steps_timer_within_doubling_bound() {
    let channel = MockChannel::new();
    channel.ok(
        &["cluster/status", "Northbound"],
        &status_report(SERVER_ADDRESS, "leader", "1500", SERVERS),
    );
    channel.ok(
        &["cluster/change-election-timer", "Northbound", "2000"],
        "change of election timer initiated",
    );
    let mut db = test_db(channel.clone());
    db.election_timer = 2000;

    ensure_election_timeout(&db).await.unwrap();
    assert_eq!(
        channel.calls_matching("cluster/change-election-timer"),
        vec!["cluster/change-election-timer Northbound 2000".to_string()]
    );
}

#[tokio::test]
async fn test_leader_clamps_step_to_double_when_target_is_far() {
    let channel = MockChannel::new();
    channel.ok(
        &["cluster/status", "Northbound"],
        &status_report(SERVER_ADDRESS, "leader", "1500", SERVERS),
    );
    channel.ok(
        &["cluster/change-election-timer", "Northbound", "3000"],
        "change of election timer initiated",
    );
    let mut db = test_db(channel.clone());
    db.election_timer = 5000;

    ensure_election_timeout(&db).await.unwrap();
    assert_eq!(
        channel.calls_matching("cluster/change-election-timer"),
        vec!["cluster/change-election-timer Northbound 3000".to_string()]
    );
}

#[tokio::test]
async fn test_change_failure_surfaces() {
    let channel = MockChannel::new();
    channel.ok(
        &["cluster/status", "Northbound"],
        &status_report(SERVER_ADDRESS, "leader", "1500", SERVERS),
    );
    channel.fail(&["cluster/change-election-timer", "Northbound", "2000"], "failure");
    let mut db = test_db(channel.clone());
    db.election_timer = 2000;

    let err = ensure_election_timeout(&db).await.unwrap_err();
    assert!(err.to_string().contains("failed to change election timer"));
}
