use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use log::info;

use crate::builder::{BuildOptions, RecordBuilder};
use crate::cli::SubCommandExtend;
use crate::collab::{ChatDescriber, Describer, Embedder, GoogleSearcher, HistogramEmbedder, Searcher, SimilarityFilter};
use crate::config::{DescriberOptions, OPENAI_BASE_URL, Opts, SearchOptions};
use crate::discover::{DEFAULT_SUFFIX, Discoverer, FileRange};
use crate::download::Downloader;
use crate::pipeline::{self, FailurePolicy, RunOptions};

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    #[command(flatten)]
    pub describer: DescriberOptions,
    #[command(flatten)]
    pub search: SearchOptions,
    /// 图片所在目录
    pub source: PathBuf,
    /// 下载结果的输出目录，每张图片对应其中一个子目录
    pub output: PathBuf,
    /// 只处理排序后指定范围内的文件，例如 0:100
    #[arg(long, value_name = "A:B")]
    pub range: Option<FileRange>,
    /// 图片后缀名，多个后缀用逗号分隔
    #[arg(long, value_name = "SUFFIX", default_value = DEFAULT_SUFFIX)]
    pub suffix: Discoverer,
    /// 附加到提示词中的上下文
    #[arg(long)]
    pub context: Option<String>,
    /// 图片主题
    #[arg(long)]
    pub theme: Option<String>,
    /// 提示词中使用的搜索引擎名称
    #[arg(long, default_value = "google_images")]
    pub engine: String,
    /// 颜色直方图每个通道的分桶数
    #[arg(long, value_name = "N", default_value_t = 8)]
    pub bins: u32,
    /// 同时处理的图片数量
    #[arg(short, long, value_name = "N", default_value_t = num_cpus::get().min(4))]
    pub jobs: usize,
    /// 单张图片失败时跳过而不是中止
    #[arg(long)]
    pub skip_failed: bool,
    /// 把搜索结果下载到输出目录
    #[arg(long)]
    pub download: bool,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        if self.describer.openai_api_key.is_none() && self.describer.openai_base_url == OPENAI_BASE_URL {
            bail!("缺少 OPENAI_API_KEY");
        }
        let (Some(api_key), Some(engine_id)) = (&self.search.google_api_key, &self.search.google_cse_id) else {
            bail!("缺少 GOOGLE_API_KEY 或 GOOGLE_CSE_ID");
        };

        let embedder = HistogramEmbedder::new(self.bins)?;
        let describer = ChatDescriber::new(
            &self.describer.openai_base_url,
            self.describer.openai_api_key.clone(),
            &self.describer.model,
        )?
        .max_tokens(self.describer.max_tokens)
        .image_type(self.describer.image_type);
        let searcher = GoogleSearcher::new(api_key, engine_id)?.file_type(self.search.file_type.clone());

        match self.search.similarity {
            Some(threshold) => {
                info!("按相似度 {} 过滤搜索结果", threshold);
                let searcher = SimilarityFilter::new(searcher, embedder, threshold)?;
                self.execute(opts, &embedder, &describer, &searcher).await
            }
            None => self.execute(opts, &embedder, &describer, &searcher).await,
        }
    }
}

impl AddCommand {
    fn run_options(&self, opts: &Opts) -> Result<RunOptions> {
        let mut run = RunOptions::new(&self.source, opts.store.path());
        run.range = self.range;
        run.discoverer = self.suffix.clone();
        run.jobs = self.jobs;
        run.policy = if self.skip_failed { FailurePolicy::Skip } else { FailurePolicy::Abort };
        if self.download {
            run.downloader = Some(Downloader::new()?);
        }
        Ok(run)
    }

    fn builder(&self) -> RecordBuilder {
        RecordBuilder::new(&self.output).options(BuildOptions {
            extra_context: self.context.clone(),
            theme: self.theme.clone(),
            search_engine: self.engine.clone(),
            link_count: self.search.count,
            size_hint: self.search.img_size.clone(),
            type_hint: self.search.img_type.clone(),
        })
    }

    async fn execute<E, D, S>(&self, opts: &Opts, embedder: &E, describer: &D, searcher: &S) -> Result<()>
    where
        E: Embedder,
        D: Describer,
        S: Searcher,
    {
        let run = self.run_options(opts)?;
        let summary = pipeline::run(&run, &self.builder(), embedder, describer, searcher).await?;
        println!(
            "processed: {}, inserted: {}, updated: {}, failed: {}",
            summary.processed, summary.inserted, summary.updated, summary.failed
        );
        Ok(())
    }
}
