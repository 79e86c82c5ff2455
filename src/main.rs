//! Quarry CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use quarry::cli::App;
use quarry::config::Config;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let app = App::parse();
    let config = Config::load()?;

    // Initialize logging on stderr so stdout stays machine-readable
    let filter = if app.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(&config.log.level).unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    app.run(config).await
}
