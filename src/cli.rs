use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Terminal chat widget for a JSON chat backend", long_about = None)]
pub struct Args {
    /// Path to a TOML config file. Built-in defaults are used when omitted.
    #[arg(short = 'c', long, env = "CHATPANE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend variant (direct, relay). Overrides `widget.variant`.
    #[arg(long, env = "CHATPANE_VARIANT")]
    pub variant: Option<String>,

    /// Chat endpoint URL, or a path resolved against `backend.base_url`.
    #[arg(long, env = "CHATPANE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// File holding the persisted conversation hash (relay only).
    #[arg(long, env = "CHATPANE_STORE")]
    pub store: Option<PathBuf>,
}
