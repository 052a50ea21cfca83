use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::store::image_paths;

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// 按目录分组显示文件名
    #[arg(long)]
    pub group: bool,
    /// 只列出输出目录
    #[arg(long, conflicts_with = "group")]
    pub outputs: bool,
}

impl SubCommandExtend for ListCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = opts.store.open()?;

        if self.group {
            for (dir, files) in store.group_by_directory() {
                println!("{}", dir);
                for file in files {
                    println!("\t{}", file);
                }
            }
        } else if self.outputs {
            for dir in store.output_directories() {
                println!("{}", dir);
            }
        } else {
            for path in image_paths(store.records()) {
                println!("{}", path.display());
            }
        }
        Ok(())
    }
}
