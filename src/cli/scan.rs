use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::discover::{self, DEFAULT_SUFFIX, Discoverer, FileRange};
use crate::store::{MergeOutcome, Record};

/// 登记目录下的图片，已有记录保持不变
#[derive(Parser, Debug, Clone)]
pub struct ScanCommand {
    /// 图片所在目录
    pub source: PathBuf,
    /// 只处理排序后指定范围内的文件，例如 0:100
    #[arg(long, value_name = "A:B")]
    pub range: Option<FileRange>,
    /// 图片后缀名，多个后缀用逗号分隔
    #[arg(long, value_name = "SUFFIX", default_value = DEFAULT_SUFFIX)]
    pub suffix: Discoverer,
}

impl SubCommandExtend for ScanCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let paths = discover::slice(self.suffix.discover(&self.source)?, self.range);
        let mut store = opts.store.load()?;

        let mut inserted = 0;
        for path in &paths {
            if let MergeOutcome::Inserted = store.upsert(Record::skeleton(path)) {
                inserted += 1;
            }
        }
        store.save(opts.store.path())?;

        info!("扫描到 {} 张图片，新增 {} 条记录", paths.len(), inserted);
        println!("scanned: {}, inserted: {}", paths.len(), inserted);
        Ok(())
    }
}
