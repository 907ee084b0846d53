//! cubic-shell CLI binary
//!
//! Usage: cubic-shell [--config <file.json>]

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cubic-shell")]
#[command(about = "Explore the CuBiC color grid in a desktop window", long_about = None)]
struct Cli {
    /// JSON config file (grid size, extent, damping, camera)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match cubic_shell::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = cubic_shell::run(config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
