//! End-to-End Test Support for Portal
//!
//! Fixtures that stand up a supervisor with two doors, and scripted
//! scenarios that check door contents after every transfer.

pub mod fixtures;
pub mod scenarios;

pub use fixtures::{test_config, PortalFixture};
pub use scenarios::{golden_path, run_scenario, Scenario, ScenarioReport, Step};
