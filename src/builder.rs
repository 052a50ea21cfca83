use std::path::{Path, PathBuf};

use log::debug;

use crate::collab::{DescribeRequest, Describer, Embedder, SearchQuery, Searcher};
use crate::error::{CatalogError, Result, Stage};
use crate::store::{Embedding, Record};
use crate::utils::file_stem;

/// 生成记录时传给协作者的参数
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub extra_context: Option<String>,
    pub theme: Option<String>,
    pub search_engine: String,
    /// 每张图片搜索的链接数量
    pub link_count: usize,
    pub size_hint: String,
    pub type_hint: String,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            extra_context: None,
            theme: None,
            search_engine: "google_images".to_string(),
            link_count: 5,
            size_hint: "LARGE".to_string(),
            type_hint: "photo".to_string(),
        }
    }
}

/// 为单个文件生成全新的记录，不读写磁盘
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    output_root: PathBuf,
    options: BuildOptions,
}

impl RecordBuilder {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self { output_root: output_root.into(), options: BuildOptions::default() }
    }

    pub fn options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// 该文件下载结果的目录：`output_root/<文件名去掉扩展名>`
    pub fn output_dir_for(&self, path: &Path) -> PathBuf {
        self.output_root.join(file_stem(path))
    }

    /// 依次调用嵌入、描述、搜索，协作者的错误原样向上传递
    pub async fn build<E, D, S>(&self, path: &Path, embedder: &E, describer: &D, searcher: &S) -> Result<Record>
    where
        E: Embedder,
        D: Describer,
        S: Searcher,
    {
        let embedding = embedder
            .embed(path)
            .await
            .map_err(|e| CatalogError::collaborator(Stage::Embed, path, e))?;

        let request = DescribeRequest {
            embedding: &embedding,
            extra_context: self.options.extra_context.as_deref(),
            theme: self.options.theme.as_deref(),
            engine_hint: &self.options.search_engine,
        };
        let description = describer
            .describe(&request)
            .await
            .map_err(|e| CatalogError::collaborator(Stage::Describe, path, e))?;

        let query = SearchQuery {
            text: &description.short,
            count: self.options.link_count,
            size_hint: &self.options.size_hint,
            type_hint: &self.options.type_hint,
            reference: Some(&embedding),
        };
        let links = searcher
            .find_links(&query)
            .await
            .map_err(|e| CatalogError::collaborator(Stage::Search, path, e))?;
        debug!("{}: 找到 {} 个链接", path.display(), links.len());

        let mut record = Record::skeleton(path);
        record.output_file_directory = self.output_dir_for(path).to_string_lossy().into_owned();
        record.img_counts = links.len() as u64;
        record.search_links = links;
        record.short_description = description.short;
        record.long_description = description.long;
        record.embedding = Embedding::Vector(embedding);
        Ok(record)
    }
}
