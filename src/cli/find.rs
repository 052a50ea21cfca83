use anyhow::Result;
use clap::Parser;

use crate::cli::{OutputFormat, SubCommandExtend};
use crate::config::Opts;
use crate::store::{DescriptionField, image_paths};

#[derive(Parser, Debug, Clone)]
pub struct FindCommand {
    /// 关键字，忽略大小写
    pub query: String,
    /// 在哪一段描述中查找
    #[arg(long, value_enum, default_value_t = DescriptionField::Long)]
    pub field: DescriptionField,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for FindCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = opts.store.open()?;
        let paths = image_paths(store.filter_by_description(&self.query, self.field));

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&paths)?),
            OutputFormat::Table => {
                for path in paths {
                    println!("{}", path.display());
                }
            }
        }
        Ok(())
    }
}
