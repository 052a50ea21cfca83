use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::store::{self, DescriptionField};

#[derive(Parser, Debug, Clone)]
pub struct ExportCommand {
    /// 导出的 CSV 文件路径
    pub output: PathBuf,
    /// 只导出描述中包含该关键字的记录
    #[arg(long)]
    pub query: Option<String>,
    /// 关键字匹配哪一段描述
    #[arg(long, value_enum, default_value_t = DescriptionField::Long)]
    pub field: DescriptionField,
}

impl SubCommandExtend for ExportCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = opts.store.open()?;
        match &self.query {
            Some(query) => store::export(db.filter_by_description(query, self.field), &self.output)?,
            None => store::export(db.records(), &self.output)?,
        }
        Ok(())
    }
}
