//! swctl - command line controller for SiteWhere on Kubernetes

use clap::Parser;
use swctl::cli::{self, Cli};
use swctl::config::SettingsLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut settings = match SettingsLoader::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    settings.debug = settings.debug || cli.debug;
    let debug = settings.debug;

    cli::init_logging(debug);
    tracing::debug!("Loaded settings: namespace={}", settings.namespace);

    let outcome = tokio::select! {
        result = cli::run(cli, settings) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    // the command future is dropped by now, so held locks are released
    let Some(outcome) = outcome else {
        tracing::debug!("Interrupted");
        std::process::exit(130);
    };

    if let Err(e) = outcome {
        if debug {
            eprintln!("Error: {:?}", anyhow::Error::from(e));
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}
