use anyhow::Result;
use clap::Args;
use option_ledger_core::{Clock, SystemClock};

use crate::app::App;
use crate::render;

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    #[arg(long)]
    pub name: String,
}

/// # Errors
/// Returns an error if the ledger cannot be loaded.
pub fn run_list(app: &App) -> Result<()> {
    let ledger = app.load_ledger()?;
    print!("{}", render::option_list(&ledger, SystemClock.today()));
    Ok(())
}

/// # Errors
/// Returns an error if the ledger cannot be loaded or the option does not exist.
pub fn run_show(app: &App, args: ShowArgs) -> Result<()> {
    let ledger = app.load_ledger()?;
    let option = ledger.require(&args.name)?;
    print!("{}", render::option_detail(option));
    Ok(())
}
