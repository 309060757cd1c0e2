//! Scenario: switched-off guardrails and rate limiting.
//!
//! First the default configuration exhausts the `ai_prompts` budget. Then
//! rate limiting and caching are switched off: the bypass is audited once at
//! startup and every request reaches the model.

use warden_contracts::{
    audit::actions,
    config::GuardConfig,
    error::GuardResult,
};

use super::{banner, describe, Harness};
use crate::mock_data::MockModel;
use crate::warden::OperationSettings;

const CODE: &str = "SELECT id, email FROM accounts WHERE active = true";

pub async fn run_scenario(config: &GuardConfig) -> GuardResult<()> {
    banner("Scenario: Rate Limits and Guardrail Bypass");

    let limited = Harness::new(config.clone(), MockModel::new(), OperationSettings::default())?;
    let developer = limited.actor("user_002")?;
    let budget = limited.warden.limiter().limit_for("ai_prompts").unwrap_or(0);
    println!("  ai_prompts budget: {budget} per window");
    for i in 1..=budget + 1 {
        let result = limited
            .warden
            .review_code(&developer, &format!("CS_{i:03}"), CODE)
            .await;
        if !result.is_success() {
            println!("  request {i}: {}", describe(&result));
        }
    }
    println!(
        "  rate_limited events: {}",
        limited.sink.events_with_action(actions::RATE_LIMITED).len()
    );
    println!();

    let mut relaxed = config.clone();
    relaxed.features.rate_limiting = false;
    relaxed.features.caching = false;
    let bypassed = Harness::new(relaxed, MockModel::new(), OperationSettings::default())?;
    let developer = bypassed.actor("user_002")?;
    for _ in 0..=budget {
        bypassed.warden.review_code(&developer, "CS_001", CODE).await;
    }
    println!(
        "  With rate limiting and caching off: {} request(s), {} model call(s)",
        budget + 1,
        bypassed.model.calls()
    );
    for event in bypassed.sink.events_with_action(actions::GUARDRAIL_BYPASS_ENABLED) {
        println!("    bypass recorded: {}", event.metadata["guardrail"]);
    }
    println!();
    Ok(())
}
