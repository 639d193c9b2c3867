use crate::config::HarnessConfig;
use crate::docker::{DockerClient, EnvironmentFixture};
use crate::errors::Result;
use colored::*;
use std::env;

/// Build a fixture from the config found in the current directory
pub fn open_fixture() -> Result<EnvironmentFixture<DockerClient>> {
    let config = HarnessConfig::load(&env::current_dir()?)?;
    let client = DockerClient::from_config(&config)?;
    tracing::info!(endpoint = client.endpoint(), "Connecting to container runtime");
    EnvironmentFixture::new(config, client)
}

fn short_id(id: &str) -> &str {
    &id[..12.min(id.len())]
}

/// Start the environment and leave it running
pub fn up() -> Result<()> {
    let mut fixture = open_fixture()?;

    println!("Starting test environment...");
    let handles = fixture.start_scoped()?.detach();

    let config = fixture.config();
    println!("{:<20} {:<25} {:<12}", "CONTAINER", "IMAGE", "ID");
    println!("{}", "-".repeat(57));
    println!(
        "{:<20} {:<25} {:<12}",
        config.database.name,
        config.database.image,
        short_id(&handles.database)
    );
    println!(
        "{:<20} {:<25} {:<12}",
        config.web.name,
        config.web.image,
        short_id(&handles.web)
    );
    println!(
        "{} Web application available at {}",
        "✓".green(),
        fixture.base_url().bold()
    );

    Ok(())
}

/// Remove both reserved-name containers
pub fn down() -> Result<()> {
    let mut fixture = open_fixture()?;

    println!("Destroying test environment...");
    let removed = fixture.stop_environment()?;
    if removed.is_empty() {
        println!("Nothing to remove");
    } else {
        for id in &removed {
            println!("  removed {}", short_id(id));
        }
        println!(
            "{} Removed {} container{}",
            "✓".green(),
            removed.len(),
            if removed.len() == 1 { "" } else { "s" }
        );
    }

    Ok(())
}

/// Show whether the reserved-name containers exist and run
pub fn status() -> Result<()> {
    let fixture = open_fixture()?;
    let status = fixture.environment_status()?;

    println!("{:<20} {:<15}", "CONTAINER", "STATUS");
    println!("{}", "-".repeat(35));
    for container in [&status.database, &status.web] {
        let state = if container.running {
            "Running".green()
        } else if container.exists {
            "Stopped".yellow()
        } else {
            "Absent".dimmed()
        };
        println!("{:<20} {:<15}", container.name, state);
    }

    if status.all_running() {
        println!("\nWeb application: {}", fixture.base_url());
    }

    Ok(())
}

/// Pull (or check) both images
pub fn pull() -> Result<()> {
    let fixture = open_fixture()?;
    let images = [
        fixture.config().database.image.clone(),
        fixture.config().web.image.clone(),
    ];

    for image in images {
        let downloaded = fixture.pull_image(&image)?;
        let outcome = if downloaded {
            "downloaded".green()
        } else {
            "up to date".normal()
        };
        println!("{:<25} {}", image, outcome);
    }

    Ok(())
}
