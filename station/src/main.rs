use clap::Parser;
use log::info;
use shutdown::ShutdownFlag;
use std::path::PathBuf;
use workflow::config::StationConfig;
use workflow::context::StationContext;
use workflow::runner::Supervisor;

mod shutdown;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Records, detects, alerts and uploads evidence")]
struct Args {
    /// Load the station config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    /// Run a single cycle, then shut down
    #[arg(long, default_value_t = false)]
    once: bool,
    /// Override the alert threshold from the config
    #[arg(long)]
    threshold: Option<usize>,
    /// Log alarm transitions instead of driving the GPIO pin
    #[arg(long, default_value_t = false)]
    mock_alarm: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match args.config {
        Some(path) => StationConfig::load(path)?,
        None => StationConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    config.validate()?;

    let shutdown = ShutdownFlag::default();
    shutdown::install(shutdown.clone())?;

    let context = StationContext::init(config, args.mock_alarm)?;
    let mut supervisor = Supervisor::new(context);
    supervisor.run(&shutdown, args.once);

    info!("{}", supervisor.metrics());
    supervisor.into_context().shutdown()
}
