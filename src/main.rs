use clap::{Parser, Subcommand};
use mdms_harness::cli;
use mdms_harness::errors::Result;
use mdms_harness::scenario::rights::ACCESS_RIGHTS;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "mdms-harness")]
#[command(about = "Provision the MDMS web app and its database in containers and check it end to end", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output from the harness
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove stale containers, then start the database and web containers
    Up,
    /// Remove the database and web containers
    Down,
    /// Show the state of the reserved containers
    Status,
    /// Pull or check both images
    Pull,
    /// Start the environment, run a scenario and always tear down
    Run {
        /// Scenario to run
        #[arg(short, long, default_value = ACCESS_RIGHTS)]
        scenario: String,
        /// Leave the containers running afterwards
        #[arg(long)]
        keep: bool,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("mdms_harness=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Up => cli::docker::up()?,
        Commands::Down => cli::docker::down()?,
        Commands::Status => cli::docker::status()?,
        Commands::Pull => cli::docker::pull()?,
        Commands::Run { scenario, keep } => cli::run::run(&scenario, keep)?,
    }

    Ok(())
}
