//! Commands that edit the ledger: add, update, delete and manual price or
//! close-amount entry. Each successful edit is saved immediately.

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::Args;
use option_ledger_core::calendar::{add_date, consecutive_dates, merge_dates};
use option_ledger_core::OptionTerms;

use crate::app::App;

/// Trade dates given explicitly and/or as a generated run of days.
#[derive(Args, Debug, Clone, Default)]
pub struct DateArgs {
    /// Trade date (YYYY-MM-DD); repeat for several dates
    #[arg(long = "date")]
    pub dates: Vec<NaiveDate>,

    /// First date of a generated run of trade dates
    #[arg(long, requires = "count")]
    pub start: Option<NaiveDate>,

    /// Number of dates to generate from --start
    #[arg(long, requires = "start")]
    pub count: Option<usize>,

    /// Keep Saturdays and Sundays when generating dates
    #[arg(long)]
    pub include_weekends: bool,
}

impl DateArgs {
    /// Collected dates in the order given, or `None` if no date option was used.
    ///
    /// # Errors
    /// Returns an error if the same `--date` is given twice.
    pub fn collect(&self) -> Result<Option<Vec<NaiveDate>>> {
        if self.dates.is_empty() && self.start.is_none() {
            return Ok(None);
        }

        let mut dates = Vec::new();
        for date in &self.dates {
            add_date(&mut dates, *date)?;
        }
        if let (Some(start), Some(count)) = (self.start, self.count) {
            let generated = consecutive_dates(start, count, !self.include_weekends);
            merge_dates(&mut dates, &generated);
        }
        Ok(Some(dates))
    }
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    #[arg(long)]
    pub name: String,

    /// Exchange contract code used for price lookups (e.g. m2601)
    #[arg(long)]
    pub code: String,

    #[arg(long)]
    pub strike: f64,

    /// Signed initial amount; negative for a short exposure
    #[arg(long, allow_negative_numbers = true)]
    pub amount: f64,

    #[command(flatten)]
    pub dates: DateArgs,

    /// Replace an existing option with the same name
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub code: Option<String>,

    #[arg(long)]
    pub strike: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub amount: Option<f64>,

    /// Replaces the whole trade-date list when given
    #[command(flatten)]
    pub dates: DateArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(long)]
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct CloseArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub date: NaiveDate,

    /// Amount closed manually on the date
    #[arg(long, allow_negative_numbers = true)]
    pub amount: f64,
}

#[derive(Args, Debug, Clone)]
pub struct SetPriceArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub date: NaiveDate,

    #[arg(long)]
    pub price: f64,
}

/// # Errors
/// Returns an error if the input is invalid, the name is taken without
/// `--overwrite`, or the ledger cannot be saved.
pub fn run_add(app: &App, args: AddArgs) -> Result<()> {
    let trade_dates = args
        .dates
        .collect()?
        .ok_or_else(|| anyhow!("at least one trade date is required (--date or --start/--count)"))?;

    let mut ledger = app.load_ledger()?;
    ledger.create(
        &args.name,
        OptionTerms {
            code: args.code,
            strike_price: args.strike,
            initial_amount: args.amount,
            trade_dates,
        },
        args.overwrite,
    )?;
    app.save_ledger(&ledger)?;

    println!("Saved option {}", args.name);
    Ok(())
}

/// # Errors
/// Returns an error if the option does not exist, the new terms are invalid,
/// or the ledger cannot be saved.
pub fn run_update(app: &App, args: UpdateArgs) -> Result<()> {
    let mut ledger = app.load_ledger()?;
    let mut terms = ledger.require(&args.name)?.terms();

    if let Some(code) = args.code {
        terms.code = code;
    }
    if let Some(strike) = args.strike {
        terms.strike_price = strike;
    }
    if let Some(amount) = args.amount {
        terms.initial_amount = amount;
    }
    if let Some(dates) = args.dates.collect()? {
        terms.trade_dates = dates;
    }

    ledger.update(&args.name, terms)?;
    app.save_ledger(&ledger)?;

    println!("Updated option {}", args.name);
    Ok(())
}

/// # Errors
/// Returns an error if the option does not exist or the ledger cannot be saved.
pub fn run_delete(app: &App, args: DeleteArgs) -> Result<()> {
    let mut ledger = app.load_ledger()?;
    ledger.delete(&args.name)?;
    app.save_ledger(&ledger)?;

    println!("Deleted option {}", args.name);
    Ok(())
}

/// # Errors
/// Returns an error if the option or date is unknown, the amount is not a
/// number, or the ledger cannot be saved.
pub fn run_close(app: &App, args: CloseArgs) -> Result<()> {
    let mut ledger = app.load_ledger()?;
    ledger.set_close_amount(&args.name, args.date, args.amount)?;
    app.save_ledger(&ledger)?;

    let position = ledger
        .require(&args.name)?
        .position(args.date)
        .unwrap_or_default();
    println!(
        "Recorded close amount {:.2} for {} on {}; position is now {:.2}",
        args.amount, args.name, args.date, position
    );
    Ok(())
}

/// # Errors
/// Returns an error if the option or date is unknown, the price is invalid,
/// or the ledger cannot be saved.
pub fn run_set_price(app: &App, args: SetPriceArgs) -> Result<()> {
    let mut ledger = app.load_ledger()?;
    ledger.set_close_price(&args.name, args.date, args.price)?;
    app.save_ledger(&ledger)?;

    println!(
        "Set close price of {} on {} to {:.2}",
        args.name, args.date, args.price
    );
    Ok(())
}
