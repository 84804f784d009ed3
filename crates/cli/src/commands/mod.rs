//! CLI commands for the option ledger.

pub mod inspect;
pub mod maintain;
pub mod tasks;

pub use inspect::{run_list, run_show, ShowArgs};
pub use maintain::{
    run_add, run_close, run_delete, run_set_price, run_update, AddArgs, CloseArgs, DeleteArgs,
    SetPriceArgs, UpdateArgs,
};
pub use tasks::{run_query, run_refresh, TaskArgs};
