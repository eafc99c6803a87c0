use std::sync::Arc;

use clap::Parser;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use persistent::Storage;
use registry::Registry;
use settings::{Args, Settings};

mod bot;
mod fakename;
mod impls;
mod numbers;
mod persistent;
mod registry;
mod scheduler;
mod settings;
mod submissions;
mod totp;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(&args.log_level);
    let settings = Arc::new(Settings::resolve(&args)?);

    let storage = Storage::new(&settings.data_file);
    let data = storage.load()?;
    log::info!("data loaded from {}", storage.path().display());
    let (sender, db_worker) = persistent::worker(storage);
    let registry = Arc::new(Registry::new(data, sender));

    let result = bot::start(settings, registry.clone()).await;
    registry.shutdown();
    db_worker.await?;
    result
}

fn init_logger(level: &str) {
    let level = level.parse().unwrap_or(LevelFilter::Info);
    let config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();
    if let Err(e) = TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto) {
        eprintln!("cannot init logger: {}", e);
    }
}
