//! NF1 entry point: the API frontend and its callback endpoint.

use anyhow::Context;

use nfsim::app::init_role_telemetry;
use nfsim::cli::{parse_args, usage, Command};
use nfsim::{load_config, log_report, Nf1App};
use nfsim_config::{Nf1Config, NfConfig};
use nfsim_server::ShutdownSignal;

#[tokio::main]
async fn main() {
    let config_path = match parse_args(std::env::args().skip(1)) {
        Ok(Command::Run { config }) => config,
        Ok(Command::Help) => {
            println!(
                "{}",
                usage("nf1", "NF1 - API frontend and callback endpoint", Nf1Config::ENV_PREFIX)
            );
            std::process::exit(0);
        }
        Ok(Command::Version) => {
            println!("nf1 {}", nfsim::VERSION);
            std::process::exit(0);
        }
        Err(message) => {
            eprintln!("{message}");
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&config_path).await {
        // Telemetry may not be installed yet.
        eprintln!("nf1: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config_path: &std::path::Path) -> anyhow::Result<()> {
    let config: Nf1Config = load_config(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    init_role_telemetry(&config).context("failed to initialize telemetry")?;
    config.log_summary();

    let app = Nf1App::new(config)?;
    let shutdown = ShutdownSignal::with_os_signals();

    tracing::info!(version = nfsim::VERSION, "starting NF1");
    let report = app.lifecycle(shutdown).listeners(app.listeners()).run().await;
    log_report(Nf1Config::ROLE, &report);

    tracing::info!("exiting NF1 servers");
    Ok(())
}
