// src/main.rs

use flowgraph::{cli, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("flowgraph error: {err:?}");
            std::process::exit(1);
        }
    }
}

/// Returns `false` when the flow run finished as invalid.
async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    let outcome = run(args).await?;
    Ok(outcome.is_none_or(|o| o.is_success()))
}
