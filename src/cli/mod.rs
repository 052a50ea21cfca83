use std::convert::Infallible;
use std::str::FromStr;

use clap::ValueEnum;

mod add;
mod export;
mod find;
mod list;
mod scan;
mod show;
mod similar;
mod stats;

pub use add::*;
pub use export::*;
pub use find::*;
pub use list::*;
pub use scan::*;
pub use show::*;
pub use similar::*;
pub use stats::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            _ => Ok(Self::Table),
        }
    }
}
