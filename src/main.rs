mod cli;

use clap::Parser;
use cli::{Cli, Commands, ResolveArgs};
use std::path::PathBuf;

use mediagate::api;
use mediagate::config::Config;
use mediagate::observability::init_tracing;
use mediagate::resolver::{ClientContext, DriveResolver, MediaRequest, MediaResolver, Quality};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            let mut config = load_config(args.config)?;
            init_tracing(config.telemetry.log_filter.as_deref());
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            api::run(config).await?
        }
        Commands::Resolve(args) => resolve(args)?,
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config, AnyError> {
    let config = match path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

fn resolve(args: ResolveArgs) -> Result<(), AnyError> {
    let config = load_config(args.config)?;
    init_tracing(config.telemetry.log_filter.as_deref());

    let base_url = args.base_url.unwrap_or(config.upstream.base_url);
    let resolver = DriveResolver::new(&base_url)?;

    let request = MediaRequest::builder()
        .id(args.id.trim())
        .quality(Quality::parse(&args.quality))
        .build();
    let client = ClientContext::new(args.user_agent);
    let resolved = resolver.resolve(&request, &client)?;

    println!("GET {}", resolved.url);
    for (name, value) in &resolved.headers {
        println!("{name}: {value}");
    }
    println!();
    println!("device: {:?}", resolved.device);
    println!("quality: {}", resolved.quality);
    println!("cache-control: {}", resolved.cache_policy.header_value());
    Ok(())
}
