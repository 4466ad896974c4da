//! foliocache - offline-first asset cache for a portfolio site

use clap::Parser;

mod cache;
mod cli;
mod client;
mod config;
mod error;
mod optimizer;
mod output;

use cli::args::GlobalOptions;
use cli::{CacheCommands, Cli, CommandContext, Commands};
use error::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// `--debug` forces debug level; otherwise RUST_LOG, defaulting to warn
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Init => cli::init::run(&opts),
        Commands::Status => cli::status::run(&opts),
        Commands::Version => {
            println!("foliocache version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Classify { urls } => cli::classify::run(&opts, &urls),
        Commands::Completion { shell } => {
            cli::completions::run(shell);
            Ok(())
        }
        Commands::Cache(CacheCommands::Path) => cli::cache::path(&opts),
        Commands::Fetch { url, method, out } => {
            let ctx = CommandContext::new(&opts)?;
            cli::fetch::run(&ctx, &url, &method, out.as_deref()).await
        }
        Commands::Cache(cache_cmd) => {
            let ctx = CommandContext::new(&opts)?;
            match cache_cmd {
                CacheCommands::Status => cli::cache::status(&ctx, &opts),
                CacheCommands::Clear { yes } => cli::cache::clear(&ctx, yes),
                CacheCommands::Cleanup => cli::cache::cleanup(&ctx),
                CacheCommands::Preload => cli::cache::preload(&ctx).await,
                CacheCommands::Path => cli::cache::path(&opts),
            }
        }
        Commands::Janitor { interval_secs } => {
            let ctx = CommandContext::new(&opts)?;
            cli::janitor::run(&ctx, interval_secs).await
        }
        Commands::Image { url, accept, lazy } => {
            let ctx = CommandContext::new(&opts)?;
            cli::image::run(&ctx, &url, accept.as_deref(), lazy).await
        }
    }
}
