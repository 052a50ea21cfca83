use std::path::{Path, PathBuf};

use futures::{StreamExt, stream};
use indicatif::ProgressBar;
use log::{info, warn};

use crate::builder::RecordBuilder;
use crate::collab::{Describer, Embedder, Searcher};
use crate::discover::{self, Discoverer, FileRange};
use crate::download::Downloader;
use crate::error::Result;
use crate::store::{MergeOutcome, MetadataStore};
use crate::utils::pb_style;

/// 单个文件生成失败时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// 中止整个运行，不保存任何结果
    #[default]
    Abort,
    /// 记录警告并跳过该文件，运行结束时保存其余结果
    Skip,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source_dir: PathBuf,
    pub store_path: PathBuf,
    pub range: Option<FileRange>,
    pub discoverer: Discoverer,
    /// 同时生成记录的文件数
    pub jobs: usize,
    pub policy: FailurePolicy,
    pub downloader: Option<Downloader>,
}

impl RunOptions {
    pub fn new(source_dir: impl Into<PathBuf>, store_path: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            store_path: store_path.into(),
            range: None,
            discoverer: Discoverer::default(),
            jobs: 1,
            policy: FailurePolicy::default(),
            downloader: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 范围内的文件数
    pub discovered: usize,
    pub processed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

/// 扫描、生成、合并，最后整体写回存储
///
/// 记录可以并发生成，但合并只在这一个循环里按扫描顺序进行。
pub async fn run<E, D, S>(
    opts: &RunOptions,
    builder: &RecordBuilder,
    embedder: &E,
    describer: &D,
    searcher: &S,
) -> Result<RunSummary>
where
    E: Embedder,
    D: Describer,
    S: Searcher,
{
    let paths = discover::slice(opts.discoverer.discover(&opts.source_dir)?, opts.range);
    let mut store = MetadataStore::load(&opts.store_path)?;
    let mut summary = RunSummary { discovered: paths.len(), ..Default::default() };
    info!("待处理图片 {} 张", paths.len());

    let pb = ProgressBar::new(paths.len() as u64).with_style(pb_style());

    let mut results = stream::iter(paths)
        .map(move |path| async move {
            let result = builder.build(&path, embedder, describer, searcher).await;
            if let (Ok(record), Some(downloader)) = (&result, &opts.downloader) {
                let dir = Path::new(&record.output_file_directory);
                if let Err(e) = downloader.download_all(&record.search_links, dir).await {
                    warn!("无法保存下载结果 {}: {}", dir.display(), e);
                }
            }
            (path, result)
        })
        .buffered(opts.jobs.max(1));

    while let Some((path, result)) = results.next().await {
        pb.inc(1);
        let record = match (result, opts.policy) {
            (Ok(record), _) => record,
            (Err(e), FailurePolicy::Abort) => {
                pb.abandon_with_message(format!("处理失败: {}", path.display()));
                return Err(e);
            }
            (Err(e), FailurePolicy::Skip) => {
                warn!("跳过 {}: {}", path.display(), e);
                summary.failed += 1;
                continue;
            }
        };
        match store.merge(record.identity(), record) {
            MergeOutcome::Inserted => summary.inserted += 1,
            MergeOutcome::Updated(_) => summary.updated += 1,
        }
        summary.processed += 1;
        pb.set_message(path.display().to_string());
    }
    pb.finish_with_message("图片处理完成");

    store.save(&opts.store_path)?;
    info!(
        "处理 {} 张，新增 {}，更新 {}，失败 {}",
        summary.processed, summary.inserted, summary.updated, summary.failed
    );
    Ok(summary)
}
