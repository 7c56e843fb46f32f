// CLI module for gemini-chat
// Author: kelexine (https://github.com/kelexine)

use clap::Parser;
use std::path::PathBuf;

/// gemini-chat - Caching chat gateway in front of the Google Gemini API
#[derive(Parser, Debug)]
#[command(name = "gemini-chat", version, about, long_about = None)]
pub struct Args {
    /// Path to a TOML config file (default: ~/.gemini-chat/config.toml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Port to listen on; overrides PORT and the config file
    #[arg(long, short)]
    pub port: Option<u16>,

    /// Address to bind; overrides the config file
    #[arg(long)]
    pub host: Option<String>,
}
