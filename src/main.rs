// src/main.rs

use hotcompile::{cli, logging, run};

/// Exit status: 0 on success, 2 when the run finished but reported failures
/// (a failed compile, an invalid file), 1 when it could not run.
#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("hotcompile error: {err:?}");
            std::process::exit(1);
        }
    }
}

async fn run_main() -> anyhow::Result<bool> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
