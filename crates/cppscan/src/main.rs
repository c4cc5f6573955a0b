use clap::Parser;
use cppscan::Args;
use eyre::Result;

fn init_tracing() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("CPPSCAN_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| eyre::eyre!("failed to initialize tracing subscriber: {e}"))
}

fn main() -> Result<()> {
    init_tracing()?;

    let args = Args::parse();
    if !cppscan::run(args)? {
        std::process::exit(1);
    }
    Ok(())
}
