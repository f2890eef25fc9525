use std::path::Path;
use std::process;

use precision_sleep_bench::core::{load_parameters, run_with, SETTINGS_FILE};

#[tokio::main]
async fn main() {
    let parameters = match load_parameters(Path::new(SETTINGS_FILE)) {
        Ok(parameters) => parameters,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    let default_level = if parameters.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run_with(&parameters).await {
        Ok(summary) if summary.failed() > 0 => process::exit(2),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Fatal error: {}", e);
            process::exit(1);
        }
    }
}
