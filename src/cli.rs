use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mediagate")]
#[command(about = "Rate-limited image proxy for the wedding gallery", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Server(ServerArgs),
    /// Print the upstream request a proxy call would make, without fetching
    Resolve(ResolveArgs),
}

#[derive(clap::Args, Debug)]
pub struct ServerArgs {
    /// Address to bind the HTTP server to (overrides `server.bind_addr`)
    #[arg(long)]
    pub address: Option<SocketAddr>,

    /// Configuration file (overrides `MEDIAGATE_CONFIG`)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Upstream file id
    #[arg(long)]
    pub id: String,

    /// thumbnail, preview, background or medium
    #[arg(long, default_value = "medium")]
    pub quality: String,

    /// Client user agent used for device detection
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Upstream base URL (overrides `upstream.base_url`)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Configuration file (overrides `MEDIAGATE_CONFIG`)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
