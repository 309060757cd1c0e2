//! Scenario: materializing the execution queue.

use warden_contracts::{config::GuardConfig, error::GuardResult};

use super::{banner, describe, Harness};
use crate::mock_data::MockModel;
use crate::warden::OperationSettings;

pub async fn run_scenario(config: &GuardConfig) -> GuardResult<()> {
    banner("Scenario: Execution Queue");

    let harness = Harness::new(config.clone(), MockModel::new(), OperationSettings::default())?;
    let developer = harness.actor("user_002")?;
    let viewer = harness.actor("user_003")?;

    let result = harness.warden.materialize_actions(&developer).await;
    println!("  Developer materializes queue: {}", describe(&result));
    for action in harness.publisher.created() {
        println!("    {:<13} {:<20} {}", action.kind, action.target, action.title);
    }

    let denied = harness.warden.materialize_actions(&viewer).await;
    println!("  Viewer materializes queue:    {}", describe(&denied));
    println!();

    harness.print_trail();
    println!();
    Ok(())
}
