use anyhow::{Result, bail};
use clap::Parser;

use crate::cli::{OutputFormat, SubCommandExtend};
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct SimilarCommand {
    /// 目标图片的文件名
    pub name: String,
    /// 相似度阈值，范围 0 到 1
    #[arg(long, default_value_t = 0.7)]
    pub threshold: f64,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SimilarCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = opts.store.open()?;
        if store.find_by_file_name(&self.name).is_none() {
            bail!("找不到记录: {}", self.name);
        }

        let result = store
            .similar_descriptions(&self.name, self.threshold)
            .into_iter()
            .map(|(score, record)| (score, record.identity().to_string()))
            .collect::<Vec<_>>();

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            OutputFormat::Table => {
                for (score, path) in result {
                    println!("{:.2}\t{}", score, path);
                }
            }
        }
        Ok(())
    }
}
