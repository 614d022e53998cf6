//! skiff - desktop-shell supervisor for a local Streamlit data app
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use skiff_core::prelude::*;

/// Desktop-shell supervisor for a local Streamlit data app
#[derive(Parser, Debug)]
#[command(name = "skiff")]
#[command(about = "Supervise a local Streamlit backend and bridge it to a display surface", long_about = None)]
struct Args {
    /// Path to the application root (contains the entry script)
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,

    /// Override the backend listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    skiff_core::logging::init()?;

    let args = Args::parse();

    let app_root = args
        .path
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if let Err(err) = skiff::run(&app_root, args.port).await {
        error!("Shell exited with error: {}", err);
        return Err(err.into());
    }

    Ok(())
}
