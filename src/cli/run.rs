use crate::cli::docker::open_fixture;
use crate::errors::{HarnessError, Result};
use crate::scenario::{self, ScenarioReport};
use colored::*;

/// Bring the environment up, run a scenario, then tear down.
/// With `keep` the containers are left running for inspection.
pub fn run(scenario_name: &str, keep: bool) -> Result<()> {
    let scenario = scenario::builtin(scenario_name).ok_or_else(|| {
        HarnessError::ConfigError(format!(
            "Unknown scenario '{}'. Available: {}",
            scenario_name,
            scenario::builtin_names().join(", ")
        ))
    })?;

    let mut fixture = open_fixture()?;

    let report = if keep {
        let environment = fixture.start_scoped()?;
        let base_url = environment.base_url();
        environment.detach();
        let report = scenario.run_against(&base_url)?;
        println!("Containers kept running at {}", base_url);
        report
    } else {
        fixture.with_environment(|environment| scenario.run_against(&environment.base_url()))?
    };

    print_report(&report);
    report.into_result()
}

fn print_report(report: &ScenarioReport) {
    match &report.failure {
        None => println!(
            "{} {}: {}/{} steps passed",
            "✓".green(),
            report.scenario.bold(),
            report.passed,
            report.total
        ),
        Some(failure) => {
            println!(
                "{} {}: failed at step {}/{}",
                "✗".red(),
                report.scenario.bold(),
                failure.index + 1,
                report.total
            );
            println!("  step:  {}", failure.step);
            println!("  error: {}", failure.error);
        }
    }
}
