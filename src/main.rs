use anyhow::{Context, Result};
use clap::Parser;
use killbot::{console, Config, KillbotService, SystemServiceControl};
use log::{debug, error, info};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;

/// Keeps selected system services stopped
#[derive(Debug, Parser)]
#[command(name = "killbot", version, about)]
struct Cli {
    /// JSON configuration file with the monitored services
    #[arg(short, long, env = "KILLBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Enforce a service from startup (service or display name, repeatable)
    #[arg(short, long = "enforce", value_name = "NAME")]
    enforce: Vec<String>,

    /// Start with enforcement paused
    #[arg(long)]
    paused: bool,

    /// Run a single pass, print the status and exit
    #[arg(long)]
    once: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn init_logging(debug_mode: bool, default_level: &str) -> Result<()> {
    let level = if debug_mode { "debug" } else { default_level };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    if debug_mode {
        builder.parse_filters("debug");
    }
    builder.try_init().context("Failed to initialize logging")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    init_logging(cli.debug, &config.log_level)?;
    debug!("Command line: {:?}", cli);

    config.enforce(&cli.enforce).context("Invalid --enforce argument")?;
    if cli.paused {
        config.start_paused = true;
    }

    let control = Arc::new(SystemServiceControl::new());
    let service = KillbotService::new(&config, control)?;

    if cli.once {
        let report = service.run_once().await;
        debug!("Single pass: {:?}", report);
        print!("{}", console::render_snapshot(&service.controller().current_snapshot()));
        return Ok(());
    }

    let running = service.start();
    let controller = running.controller();
    info!("Type 'help' for commands");

    let ctrl_c = {
        let controller = controller.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received");
                controller.shutdown();
            }
        })
    };

    tokio::select! {
        result = console::run(&controller, BufReader::new(tokio::io::stdin()), tokio::io::stdout()) => {
            if let Err(e) = result {
                error!("Console error: {}", e);
            }
            if !controller.is_shutdown_requested() {
                info!("Console input closed, running until interrupted");
                controller.shutdown_requested().await;
            }
        }
        _ = controller.shutdown_requested() => {}
    }

    ctrl_c.abort();
    running.shutdown().await?;
    info!("Service monitor stopped");
    Ok(())
}
