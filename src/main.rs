//! Concierge CLI entry point.

use anyhow::Result;
use clap::Parser;
use concierge::cli::{commands, Cli, Commands};
use concierge::config::Settings;
use concierge::engine::EngineParams;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.as_ref().map(|p| Settings::expand_path(p));
    let settings = Settings::load_from(config_path.as_ref())?;

    // -v flags win over the configured level; RUST_LOG wins over both.
    let log_level = match cli.verbose {
        0 => settings.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("concierge={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.storage_dir())?;

    match cli.command {
        Commands::Generate { index_type } => {
            commands::run_generate(index_type, settings).await?;
        }

        Commands::Ask {
            question,
            model,
            top_k,
        } => {
            commands::run_ask(&question, EngineParams { top_k, model }, settings).await?;
        }

        Commands::Chat { model, top_k } => {
            commands::run_chat(EngineParams { top_k, model }, settings).await?;
        }

        Commands::Tools { prompt } => {
            commands::run_tools(settings, prompt)?;
        }

        Commands::Doctor => {
            let path = config_path.unwrap_or_else(Settings::default_config_path);
            commands::run_doctor(&settings, &path).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(&host, port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, config_path)?;
        }
    }

    Ok(())
}
