use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use feedbridge::app::AppContext;
use feedbridge::cli::{commands, Cli, Commands};
use feedbridge::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Run { bridge, params } => {
            commands::run_bridge(&ctx, &bridge, params).await?;
        }
        Commands::List => {
            commands::list_bridges(&ctx);
        }
        Commands::Prune => {
            commands::prune_cache(&ctx)?;
        }
        Commands::Caches => {
            commands::list_caches(&ctx.config)?;
        }
    }

    Ok(())
}
