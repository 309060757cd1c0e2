//! Scenario: command sandboxing.
//!
//! The command policy is checked before anything is spawned, and a command
//! that outlives its budget is killed. The sync daemon is not deployed in
//! the demo, so an authorized run fails as a configuration error.

use std::time::Duration;

use warden_contracts::{config::GuardConfig, error::GuardResult, sandbox::CommandSpec};

use super::{banner, describe, Harness};
use crate::mock_data::MockModel;
use crate::warden::OperationSettings;

pub async fn run_scenario(config: &GuardConfig) -> GuardResult<()> {
    banner("Scenario: Command Sandbox");

    let harness = Harness::new(config.clone(), MockModel::new(), OperationSettings::default())?;
    let admin = harness.actor("user_001")?;
    let viewer = harness.actor("user_003")?;

    let checks: [(&str, CommandSpec); 4] = [
        ("benign", CommandSpec::new("python3").args(["script.py", "--verbose"])),
        ("chained", CommandSpec::new("ls").args(["-la", "&&", "rm", "-rf", "/"])),
        ("traversal", CommandSpec::new("cat").arg("../../etc/passwd")),
        ("network", CommandSpec::new("curl").arg("http://example.com")),
    ];
    println!("  Command policy:");
    for (label, spec) in &checks {
        let verdict = match harness.warden.sandbox().validator().validate_spec(spec) {
            Ok(()) => "allowed".to_string(),
            Err(e) => format!("rejected ({e})"),
        };
        println!("    {label:<10} {:<40} {verdict}", spec.command_line());
    }
    println!();

    let spec = CommandSpec::new("sleep").arg("5").timeout(Duration::from_millis(200));
    match harness.warden.sandbox().execute(&spec).await {
        Ok(result) => println!(
            "  sleep 5 with a 200 ms budget: timed_out={}, exit_code={}, stderr={:?}",
            result.timed_out, result.exit_code, result.stderr
        ),
        Err(e) => println!("  sleep 5 with a 200 ms budget: {e}"),
    }

    let denied = harness.warden.run_sync_daemon(&viewer, &["--once"]).await;
    println!("  Viewer runs sync daemon:      {}", describe(&denied));
    let missing = harness.warden.run_sync_daemon(&admin, &["--once"]).await;
    println!("  Admin, daemon not deployed:   {}", describe(&missing));
    println!();

    harness.print_trail();
    println!();
    Ok(())
}
