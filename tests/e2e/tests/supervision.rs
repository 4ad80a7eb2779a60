//! Door crashes, restarts and configuration-driven supervision

use assert_matches::assert_matches;
use portal::{Direction, DoorSupervisor, Portal, PortalError};
use portal_actors::{ActorError, ChildStatus};
use portal_config::PortalConfig;
use portal_e2e_tests::{test_config, PortalFixture};
use std::fs;
use tempfile::tempdir;
use tracing_test::traced_test;

#[tokio::test]
#[traced_test]
async fn test_crash_invalidates_handle_and_restarts_empty() {
    let fixture = PortalFixture::new(&[1, 2, 3]).await.unwrap();
    let old_orange = fixture.portal.left().clone();

    old_orange.fault("simulated crash").await.unwrap();
    let fresh = fixture.doors.await_restart(&old_orange).await.unwrap();

    let err = old_orange.pop().await.unwrap_err();
    assert_matches!(err, PortalError::DeadHandle { ref color, generation: 0 } if color.as_str() == "orange");

    // The portal still holds the dead handle
    let err = fixture.portal.transfer(Direction::TowardRight).await.unwrap_err();
    assert!(err.is_dead_handle());

    assert_eq!(fresh.generation(), 1);
    assert!(fresh.get().await.unwrap().is_empty());
    let current = fixture.doors.door("orange").await.unwrap();
    assert_eq!(current.id(), fresh.id());

    assert!(logs_contain("Rejected message for stale reference"));
}

#[tokio::test]
async fn test_rebuilt_portal_uses_fresh_doors() {
    let fixture = PortalFixture::new(&[1, 2, 3]).await.unwrap();
    fixture.portal.transfer(Direction::TowardRight).await.unwrap();

    fixture.portal.right().fault("simulated crash").await.unwrap();
    fixture.doors.await_restart(fixture.portal.right()).await.unwrap();

    let portal = Portal::setup(
        fixture.doors.door("orange").await.unwrap(),
        fixture.doors.door("blue").await.unwrap(),
        [7],
    )
    .await
    .unwrap();
    portal.transfer(Direction::TowardRight).await.unwrap();

    let snapshot = portal.snapshot().await.unwrap();
    assert_eq!(snapshot.left, vec![2, 1]);
    assert_eq!(snapshot.right, vec![7]);
}

#[tokio::test]
async fn test_restart_limit_from_config_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("portal.toml");
    fs::write(
        &config_path,
        "[supervision]\nmax_restarts = 1\nrestart_delay_ms = 0\nrestart_timeout_ms = 1000\n",
    )
    .unwrap();
    let config = PortalConfig::load_with_env(Some(&config_path), Some(Default::default())).unwrap();

    let doors: DoorSupervisor<i32> = DoorSupervisor::from_config(&config);
    let first = doors.start_child("orange").await.unwrap();
    first.fault("first").await.unwrap();
    let second = doors.await_restart(&first).await.unwrap();

    second.fault("second").await.unwrap();
    let err = doors.await_restart(&second).await.unwrap_err();
    assert_matches!(err, PortalError::Supervisor(ActorError::ChildFailed { .. }));
    assert_matches!(
        doors.door("orange").await,
        Err(PortalError::Supervisor(ActorError::ChildFailed { .. }))
    );

    let info = doors.doors().await;
    assert_eq!(info[0].status, ChildStatus::Failed);
    assert_eq!(doors.stats().restart_stats.restart_failures, 1);
    doors.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_color_is_rejected() {
    let doors: DoorSupervisor<i32> = DoorSupervisor::from_config(&test_config());
    doors.start_child("orange").await.unwrap();

    let err = portal::create(&doors, "orange").await.unwrap_err();
    assert_matches!(err, PortalError::Supervisor(ActorError::DuplicateName { .. }));
}

#[tokio::test]
async fn test_shutdown_kills_all_handles() {
    let fixture = PortalFixture::new(&[1]).await.unwrap();
    fixture.shutdown().await;

    assert!(fixture.portal.left().get().await.unwrap_err().is_dead_handle());
    assert!(fixture.portal.right().push(5).await.unwrap_err().is_dead_handle());
    assert_matches!(
        fixture.doors.start_child("green").await,
        Err(PortalError::Supervisor(ActorError::ShutDown))
    );
}
