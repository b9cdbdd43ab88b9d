mod artifacts;
mod cli;
mod defaults;
mod engine;
mod error;
mod logging;
mod model;
mod normalize;
mod orchestrator;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    logging::init(args.log_json)?;

    let result = cli::run(args).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
