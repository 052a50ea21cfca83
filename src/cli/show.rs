use anyhow::{Result, anyhow};
use clap::Parser;
use serde_json::Value;

use crate::cli::{OutputFormat, SubCommandExtend};
use crate::config::Opts;
use crate::store::{MetadataStore, Record, row_properties};

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// 文件名或记录序号
    pub target: String,
    /// 只显示这些列，多个列用逗号分隔
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for ShowCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = opts.store.open()?;
        let record = resolve(&store, &self.target).ok_or_else(|| anyhow!("找不到记录: {}", self.target))?;
        let props = row_properties(record, &self.fields);

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&props)?),
            OutputFormat::Table => {
                for (k, v) in &props {
                    match v {
                        Value::String(s) => println!("{}\t{}", k, s),
                        _ => println!("{}\t{}", k, v),
                    }
                }
            }
        }
        Ok(())
    }
}

/// 文件名优先，找不到时按序号查找
fn resolve<'a>(store: &'a MetadataStore, target: &str) -> Option<&'a Record> {
    store
        .find_by_file_name(target)
        .or_else(|| target.parse::<usize>().ok().and_then(|idx| store.nth(idx)))
}
