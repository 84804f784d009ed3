//! `refresh` and `query`: run a background task, print its progress, and
//! cancel it on Ctrl-C.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use option_ledger_core::{Clock, SystemClock};
use option_ledger_data::DceClient;
use option_ledger_tasks::{
    QueryRequest, RefreshRequest, Selection, TaskEvent, TaskHandle, TaskOutcome, TaskRunner,
    TaskSettings,
};

use crate::app::App;
use crate::render;

#[derive(Args, Debug, Clone, Default)]
pub struct TaskArgs {
    /// Work on this option only
    #[arg(long, conflicts_with = "keyword")]
    pub option: Option<String>,

    /// Work on options whose name contains this text (case-insensitive)
    #[arg(long)]
    pub keyword: Option<String>,

    /// Last trade date to include (defaults to today)
    #[arg(long)]
    pub date: Option<NaiveDate>,
}

impl TaskArgs {
    #[must_use]
    pub fn selection(&self) -> Selection {
        match (&self.option, &self.keyword) {
            (Some(name), _) => Selection::Option(name.clone()),
            (None, Some(keyword)) => Selection::Keyword(keyword.clone()),
            (None, None) => Selection::All,
        }
    }

    fn date_or_today(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| SystemClock.today())
    }
}

fn task_runner(app: &App) -> Result<TaskRunner> {
    let ledger = app.load_ledger()?.into_shared();
    let provider =
        DceClient::new(&app.config.market_data).context("failed to create market data client")?;

    Ok(
        TaskRunner::new(ledger, Arc::new(provider), app.store.clone())
            .with_settings(TaskSettings::from(&app.config)),
    )
}

/// # Errors
/// Returns an error if the task cannot start or finishes with a failure.
pub async fn run_refresh(app: &App, args: TaskArgs) -> Result<()> {
    let runner = task_runner(app)?;
    let through = args.date_or_today();
    tracing::info!(selection = ?args.selection(), %through, "Refreshing close prices");

    let handle = runner.start_refresh(RefreshRequest::new(args.selection(), through))?;
    follow(handle).await
}

/// # Errors
/// Returns an error if the task cannot start or finishes with a failure.
pub async fn run_query(app: &App, args: TaskArgs) -> Result<()> {
    let runner = task_runner(app)?;
    let query_date = args.date_or_today();
    tracing::info!(selection = ?args.selection(), %query_date, "Querying positions");

    let handle = runner.start_query(QueryRequest::new(args.selection(), query_date))?;
    follow(handle).await
}

/// Prints events until the task finishes.
async fn follow(mut handle: TaskHandle) -> Result<()> {
    let cancel = handle.cancellation_token();
    let mut cancelling = false;
    let mut outcome = None;

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(TaskEvent::Progress { percent, message }) => {
                    eprintln!("[{percent:>3}%] {message}");
                }
                Some(TaskEvent::ResultReady(snapshot)) => {
                    println!();
                    print!("{}", render::snapshot(&snapshot));
                }
                Some(TaskEvent::Finished(finished)) => outcome = Some(finished),
                None => break,
            },
            result = tokio::signal::ctrl_c(), if !cancelling => {
                if result.is_ok() {
                    tracing::info!("Received Ctrl+C, cancelling task");
                    cancel.cancel();
                }
                cancelling = true;
            }
        }
    }

    match outcome {
        Some(TaskOutcome::Completed { error_report }) => {
            let listing = render::error_report(&error_report);
            if !listing.is_empty() {
                println!();
                print!("{listing}");
            }
            println!("Done.");
            Ok(())
        }
        Some(TaskOutcome::Cancelled) => {
            println!("Cancelled; the ledger file was not updated.");
            Ok(())
        }
        Some(TaskOutcome::Failed { message }) => bail!("{} failed: {message}", handle.kind()),
        None => bail!("{} ended without a result", handle.kind()),
    }
}
