//! Transfer scenarios across the full stack: config -> supervisor -> doors -> portal

use assert_matches::assert_matches;
use futures::future::join_all;
use portal::{render, Direction, PortalError, TransferOutcome};
use portal_e2e_tests::{golden_path, run_scenario, PortalFixture};
use tracing_test::traced_test;

#[tokio::test]
async fn test_golden_path_scenario() {
    let report = run_scenario(&golden_path()).await.unwrap();
    assert_eq!(report.moved, 3);
    assert_eq!(report.no_ops, 1);
}

#[tokio::test]
async fn test_golden_path_rendering() {
    let fixture = PortalFixture::new(&[1, 2, 3]).await.unwrap();
    assert_eq!(
        render(&fixture.portal).await.unwrap(),
        "#Portal<\n     orange <=> blue\n  [1, 2, 3] <=> []\n>"
    );

    fixture.portal.transfer(Direction::TowardRight).await.unwrap();
    assert_eq!(
        fixture.portal.render().await.unwrap(),
        "#Portal<\n  orange <=> blue\n  [1, 2] <=> [3]\n>"
    );
    fixture.shutdown().await;
}

#[tokio::test]
async fn test_transfer_returns_same_portal() {
    let fixture = PortalFixture::new(&[1, 2, 3]).await.unwrap();
    let portal = &fixture.portal;

    let returned = portal
        .transfer(Direction::TowardRight)
        .await
        .unwrap()
        .transfer(Direction::TowardLeft)
        .await
        .unwrap();
    assert_eq!(returned.left().id(), portal.left().id());
    assert_eq!(returned.right().id(), portal.right().id());
    assert_eq!(fixture.contents().await.unwrap(), (vec![3, 2, 1], vec![]));
}

#[tokio::test]
async fn test_invalid_direction_mutates_nothing() {
    let fixture = PortalFixture::new(&[1, 2, 3]).await.unwrap();

    let err = fixture.portal.transfer_named("upward").await.unwrap_err();
    assert_matches!(err, PortalError::InvalidDirection(ref d) if d == "upward");
    assert_eq!(fixture.contents().await.unwrap(), (vec![3, 2, 1], vec![]));
}

#[tokio::test]
#[traced_test]
async fn test_empty_source_is_logged_noop() {
    let fixture = PortalFixture::new(&[]).await.unwrap();

    let outcome = fixture.portal.try_transfer(Direction::TowardLeft).await.unwrap();
    assert_eq!(outcome, TransferOutcome::SourceEmpty);
    assert_eq!(fixture.contents().await.unwrap(), (vec![], vec![]));
    assert!(logs_contain("Source door empty"));
}

#[tokio::test]
async fn test_disjoint_portals_run_in_parallel() {
    let data: Vec<i32> = (0..10).collect();
    let mut fixtures = Vec::new();
    for _ in 0..4 {
        fixtures.push(PortalFixture::new(&data).await.unwrap());
    }

    let transfers = fixtures.iter().map(|fixture| async move {
        for _ in 0..10 {
            fixture.portal.transfer(Direction::TowardRight).await?;
        }
        fixture.contents().await
    });

    for result in join_all(transfers).await {
        let (left, right) = result.unwrap();
        assert!(left.is_empty());
        assert_eq!(right, data);
    }
}

#[tokio::test]
async fn test_shared_door_serializes_transfers() {
    let fixture = PortalFixture::new(&(0..100).collect::<Vec<_>>()).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let portal = fixture.portal.clone();
        tasks.push(tokio::spawn(async move {
            let mut moved = 0;
            for _ in 0..30 {
                if portal.try_transfer(Direction::TowardRight).await? == TransferOutcome::Moved {
                    moved += 1;
                }
            }
            Ok::<_, PortalError>(moved)
        }));
    }

    let mut moved = 0;
    for task in tasks {
        moved += task.await.unwrap().unwrap();
    }

    let (left, right) = fixture.contents().await.unwrap();
    assert_eq!(moved, 100);
    assert!(left.is_empty());
    assert_eq!(right.len(), 100);
    let mut sorted = right.clone();
    sorted.sort();
    assert_eq!(sorted, (0..100).collect::<Vec<_>>());
}
