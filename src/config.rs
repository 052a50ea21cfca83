use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;
use crate::collab::ImageType;
use crate::error::Result;
use crate::store::MetadataStore;

pub const STORE_FILE_NAME: &str = "_img_metadata.csv";

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

static DEFAULT_STORE: LazyLock<String> = LazyLock::new(|| {
    ProjectDirs::from("", "imcatalog", "imcatalog")
        .map(|dirs| dirs.data_dir().join(STORE_FILE_NAME).to_string_lossy().into_owned())
        .unwrap_or_else(|| STORE_FILE_NAME.to_string())
});

fn default_store() -> &'static str {
    DEFAULT_STORE.as_str()
}

#[derive(Parser, Debug, Clone)]
pub struct DescriberOptions {
    /// OpenAI 兼容接口地址
    #[arg(long, value_name = "URL", env = "OPENAI_BASE_URL", default_value = OPENAI_BASE_URL)]
    pub openai_base_url: String,
    /// OpenAI API key
    #[arg(long, value_name = "KEY", env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,
    /// 生成描述使用的模型
    #[arg(long, default_value = "gpt-4o")]
    pub model: String,
    /// 单次回复的最大 token 数
    #[arg(long, value_name = "N", default_value_t = 300)]
    pub max_tokens: u32,
    /// 描述模板对应的图片类别
    #[arg(long, value_enum, default_value_t = ImageType::Product)]
    pub image_type: ImageType,
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// Google Custom Search API key
    #[arg(long, value_name = "KEY", env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,
    /// Google Custom Search 搜索引擎 ID
    #[arg(long, value_name = "ID", env = "GOOGLE_CSE_ID")]
    pub google_cse_id: Option<String>,
    /// 每张图片搜索的链接数量
    #[arg(long, value_name = "N", default_value_t = 5)]
    pub count: usize,
    /// 搜索结果的图片尺寸
    #[arg(long, value_name = "SIZE", default_value = "LARGE")]
    pub img_size: String,
    /// 搜索结果的图片类型
    #[arg(long, value_name = "TYPE", default_value = "photo")]
    pub img_type: String,
    /// 限制搜索结果的文件类型，例如 png
    #[arg(long, value_name = "EXT")]
    pub file_type: Option<String>,
    /// 下载候选图片并按向量相似度过滤，低于该值的链接被丢弃
    #[arg(long, value_name = "THRESHOLD")]
    pub similarity: Option<f32>,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imcatalog", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 元数据 CSV 文件路径
    #[arg(short, long, default_value = default_store())]
    pub store: StorePath,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 为图片生成描述和搜索结果，并合并到元数据
    Add(AddCommand),
    /// 只登记图片路径，不调用任何模型
    Scan(ScanCommand),
    /// 显示一张图片的元数据
    Show(ShowCommand),
    /// 按描述查找图片
    Find(FindCommand),
    /// 列出图片路径
    List(ListCommand),
    /// 查找描述相似的图片
    Similar(SimilarCommand),
    /// 元数据统计
    Stats(StatsCommand),
    /// 导出元数据
    Export(ExportCommand),
}

#[derive(Debug, Clone)]
pub struct StorePath {
    path: PathBuf,
}

impl StorePath {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 加载元数据，文件不存在时为空表
    pub fn load(&self) -> Result<MetadataStore> {
        MetadataStore::load(&self.path)
    }

    /// 加载已存在的元数据
    pub fn open(&self) -> Result<MetadataStore> {
        MetadataStore::open(&self.path)
    }
}

impl FromStr for StorePath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}
