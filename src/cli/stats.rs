use anyhow::Result;
use clap::Parser;

use crate::cli::{OutputFormat, SubCommandExtend};
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct StatsCommand {
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for StatsCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let summary = opts.store.open()?.summary();

        match self.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
            OutputFormat::Table => {
                println!("total_images         : {}", summary.total_images);
                println!("unique_directories   : {}", summary.unique_directories);
                println!("avg_links_per_image  : {:.2}", summary.avg_links_per_image);
                println!("images_without_links : {}", summary.images_without_links);
                for (word, count) in &summary.most_common_words {
                    println!("{}\t{}", count, word);
                }
            }
        }
        Ok(())
    }
}
