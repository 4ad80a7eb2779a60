//! Scripted transfer scenarios

use crate::fixtures::PortalFixture;
use anyhow::{bail, Context, Result};
use portal::{Direction, TransferOutcome};
use std::time::{Duration, Instant};
use tracing::info;

/// One transfer and the door contents expected afterwards
#[derive(Debug, Clone)]
pub struct Step {
    pub direction: &'static str,
    pub left: Vec<i32>,
    pub right: Vec<i32>,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub data: Vec<i32>,
    /// Contents expected right after setup
    pub initial: (Vec<i32>, Vec<i32>),
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: &'static str,
    pub moved: usize,
    pub no_ops: usize,
    pub duration: Duration,
}

/// Orange/blue walk-through: load `[1, 2, 3]`, move everything right, then
/// one more move on the empty door.
pub fn golden_path() -> Scenario {
    Scenario {
        name: "golden_path",
        data: vec![1, 2, 3],
        initial: (vec![3, 2, 1], vec![]),
        steps: vec![
            Step {
                direction: "toward-right",
                left: vec![2, 1],
                right: vec![3],
            },
            Step {
                direction: "toward-right",
                left: vec![1],
                right: vec![2, 3],
            },
            Step {
                direction: "toward-right",
                left: vec![],
                right: vec![1, 2, 3],
            },
            Step {
                direction: "toward-right",
                left: vec![],
                right: vec![1, 2, 3],
            },
        ],
    }
}

/// Run a scenario on a fresh fixture, failing at the first mismatch
pub async fn run_scenario(scenario: &Scenario) -> Result<ScenarioReport> {
    let start = Instant::now();
    let fixture = PortalFixture::new(&scenario.data)
        .await
        .context("Failed to set up portal")?;

    let initial = fixture.contents().await?;
    if initial != scenario.initial {
        bail!(
            "{}: after setup expected {:?}, found {:?}",
            scenario.name,
            scenario.initial,
            initial
        );
    }

    let mut moved = 0;
    let mut no_ops = 0;
    for (index, step) in scenario.steps.iter().enumerate() {
        let direction: Direction = step.direction.parse()?;
        match fixture.portal.try_transfer(direction).await? {
            TransferOutcome::Moved => moved += 1,
            TransferOutcome::SourceEmpty => no_ops += 1,
        }

        let (left, right) = fixture.contents().await?;
        if left != step.left || right != step.right {
            bail!(
                "{}: step {} ({}) expected {:?} <=> {:?}, found {:?} <=> {:?}",
                scenario.name,
                index,
                step.direction,
                step.left,
                step.right,
                left,
                right
            );
        }
    }

    fixture.shutdown().await;

    let report = ScenarioReport {
        name: scenario.name,
        moved,
        no_ops,
        duration: start.elapsed(),
    };
    info!(scenario = report.name, moved, no_ops, "Scenario passed");
    Ok(report)
}
