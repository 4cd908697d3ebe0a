use anyhow::Result;
use clap::Parser;
use swipetrain::{init_tracing, run_training, Config};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing().await;

    info!("Starting HomeSwipe model trainer");

    let config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("Config file not found, using default configuration");
        Config::default()
    };

    let report = run_training(config).await?;

    if let Some(last) = report.epochs.last() {
        info!(
            "Training complete: {} epochs over {} examples, final loss {:.4}",
            report.epochs.len(),
            report.examples,
            last.loss
        );
    }

    Ok(())
}
