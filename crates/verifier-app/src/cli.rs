use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML file overriding the built-in defaults.
    #[clap(long)]
    pub config_path: Option<PathBuf>,
}
