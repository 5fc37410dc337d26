// src/main.rs

use multirun::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();
    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("multirun error: {err:?}");
        std::process::exit(1);
    }

    match run(args).await {
        Ok(result) => std::process::exit(result.exit_code()),
        Err(err) => {
            eprintln!("multirun error: {err:?}");
            std::process::exit(1);
        }
    }
}
