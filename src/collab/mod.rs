//! 外部协作者：嵌入模型、描述模型与图片搜索
//!
//! 这里只定义流水线需要的接口，具体实现各自持有配置，不依赖任何全局状态。

use std::future::Future;
use std::path::Path;

use anyhow::Result;

mod chat;
mod google;
mod histogram;
mod similarity;

pub use chat::*;
pub use google::*;
pub use histogram::*;
pub use similarity::*;

/// 根据图片计算固定维度、L2 归一化的向量
pub trait Embedder: Send + Sync {
    fn embed_bytes(&self, data: Vec<u8>) -> impl Future<Output = Result<Vec<f32>>> + Send;

    fn embed(&self, path: &Path) -> impl Future<Output = Result<Vec<f32>>> + Send {
        async move {
            let data = tokio::fs::read(path).await?;
            self.embed_bytes(data).await
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DescribeRequest<'a> {
    pub embedding: &'a [f32],
    pub extra_context: Option<&'a str>,
    pub theme: Option<&'a str>,
    /// 搜索引擎提示，例如 `google_images`
    pub engine_hint: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    pub short: String,
    pub long: String,
}

/// 根据向量生成简短和详细两段描述
pub trait Describer: Send + Sync {
    fn describe(&self, request: &DescribeRequest<'_>) -> impl Future<Output = Result<Description>> + Send;
}

#[derive(Debug, Clone, Copy)]
pub struct SearchQuery<'a> {
    pub text: &'a str,
    pub count: usize,
    pub size_hint: &'a str,
    pub type_hint: &'a str,
    /// 源图片的向量，供相似度过滤使用
    pub reference: Option<&'a [f32]>,
}

/// 根据文本查询返回排好序的图片链接
pub trait Searcher: Send + Sync {
    fn find_links(&self, query: &SearchQuery<'_>) -> impl Future<Output = Result<Vec<String>>> + Send;
}
