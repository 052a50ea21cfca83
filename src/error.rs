use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// 外部协作者调用所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embed,
    Describe,
    Search,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embed => write!(f, "embed"),
            Self::Describe => write!(f, "describe"),
            Self::Search => write!(f, "search"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    /// 文件或目录不存在
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    /// 单行记录无法解析，调用方决定跳过还是中止
    #[error("malformed row: {0}")]
    MalformedRow(String),

    /// 表头与固定列集合不一致
    #[error("schema mismatch: {0}")]
    Schema(String),

    #[error("{stage} failed for {}", .path.display())]
    Collaborator {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn collaborator(stage: Stage, path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        Self::Collaborator { stage, path: path.into(), source: err.into() }
    }
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
