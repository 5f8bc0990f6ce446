// src/main.rs

use arbor::engine::ActivityOutcome;
use arbor::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(ActivityOutcome::FatalError) => std::process::exit(1),
        Ok(_) => {}
        Err(err) => {
            eprintln!("arbor error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<ActivityOutcome> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
