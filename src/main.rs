use anyhow::Result;
use clap::Parser;

use zeitwache::cli::{Args, Commands, ConfigCommands};
use zeitwache::commands;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(dispatch(args))
}

async fn dispatch(args: Args) -> Result<()> {
    let config_path = args.config.as_deref();

    match args.command {
        Commands::Init => commands::session::init(config_path),
        Commands::Login => commands::session::login(config_path).await,
        Commands::Logout => commands::session::logout(),
        Commands::Status => commands::session::status(config_path).await,
        Commands::Devices { managed } => {
            if managed {
                commands::devices::list_managed(config_path).await
            } else {
                commands::devices::list(config_path).await
            }
        }
        Commands::Config { command } => match command {
            ConfigCommands::Get { mac } => commands::quota::get(config_path, &mac).await,
            ConfigCommands::Set { mac, file } => {
                commands::quota::set(config_path, &mac, &file).await
            }
            ConfigCommands::Delete { mac } => commands::quota::delete(config_path, &mac).await,
        },
        Commands::Block { mac } => commands::quota::block(config_path, &mac).await,
        Commands::Unblock { mac } => commands::quota::unblock(config_path, &mac).await,
        Commands::AddTime { mac, minutes } => {
            commands::quota::add_time(config_path, &mac, minutes).await
        }
        Commands::AddData { mac, amount, unit } => {
            commands::quota::add_data(config_path, &mac, amount, unit).await
        }
        Commands::Usage { mac } => commands::usage::show(config_path, mac.as_deref()).await,
        Commands::History { mac, days } => {
            commands::usage::history(config_path, &mac, days).await
        }
        Commands::Watch { interval } => commands::usage::watch(config_path, interval).await,
    }
}

/// Initialize logging
fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}
