//! Scenario: retries with exponential backoff.
//!
//! The model fails twice before answering, then a second model never
//! recovers. Backoff is shortened so the demo finishes quickly.

use warden_contracts::{config::GuardConfig, error::GuardResult};

use super::{banner, describe, Harness};
use crate::mock_data::MockModel;
use crate::warden::OperationSettings;

const CODE: &str = "fn checksum(bytes: &[u8]) -> u32 { bytes.iter().map(|b| *b as u32).sum() }";

pub async fn run_scenario(config: &GuardConfig) -> GuardResult<()> {
    banner("Scenario: Retry and Backoff");

    let mut config = config.clone();
    config.retry.base_delay_ms = 100;
    config.retry.max_delay_ms = config.retry.max_delay_ms.max(100);

    let flaky = Harness::new(config.clone(), MockModel::new().failing_first(2), OperationSettings::default())?;
    let developer = flaky.actor("user_002")?;
    let result = flaky.warden.review_code(&developer, "CS_010", CODE).await;
    println!("  Flaky model (2 failures):   {}", describe(&result));
    println!("  Model calls:                {}", flaky.model.calls());

    let down = Harness::new(config, MockModel::new().failing_first(u32::MAX), OperationSettings::default())?;
    let developer = down.actor("user_002")?;
    let result = down.warden.review_code(&developer, "CS_011", CODE).await;
    println!("  Unavailable model:          {}", describe(&result));
    println!("  Model calls:                {}", down.model.calls());
    println!();

    down.print_trail();
    println!();
    Ok(())
}
