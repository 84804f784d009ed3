use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod app;
mod commands;
mod render;

use app::App;
use commands::{AddArgs, CloseArgs, DeleteArgs, SetPriceArgs, ShowArgs, TaskArgs, UpdateArgs};

#[derive(Parser)]
#[command(name = "option-ledger")]
#[command(about = "Track option positions and daily close prices", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(
        short,
        long,
        global = true,
        env = "OPTION_LEDGER_CONFIG",
        default_value = "config/Config.toml"
    )]
    config: String,

    /// Ledger file to use instead of the configured one
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an option to the ledger
    Add(AddArgs),
    /// Change the terms of an existing option
    Update(UpdateArgs),
    /// Remove an option
    Delete(DeleteArgs),
    /// List every option with its status
    List,
    /// Show one option and its state on each trade date
    Show(ShowArgs),
    /// Record a manually closed amount for a trade date
    Close(CloseArgs),
    /// Enter a close price by hand
    SetPrice(SetPriceArgs),
    /// Fetch close prices from the exchange and recompute positions
    Refresh(TaskArgs),
    /// Refetch stale prices and print positions as of a date
    Query(TaskArgs),
}

fn init_logging(log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let app = App::load(&cli.config, cli.ledger)?;

    match cli.command {
        Commands::Add(args) => commands::run_add(&app, args)?,
        Commands::Update(args) => commands::run_update(&app, args)?,
        Commands::Delete(args) => commands::run_delete(&app, args)?,
        Commands::List => commands::run_list(&app)?,
        Commands::Show(args) => commands::run_show(&app, args)?,
        Commands::Close(args) => commands::run_close(&app, args)?,
        Commands::SetPrice(args) => commands::run_set_price(&app, args)?,
        Commands::Refresh(args) => commands::run_refresh(&app, args).await?,
        Commands::Query(args) => commands::run_query(&app, args).await?,
    }

    Ok(())
}
