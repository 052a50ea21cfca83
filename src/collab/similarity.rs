use std::time::Duration;

use anyhow::{Result, bail};
use log::{debug, warn};

use super::{Embedder, SearchQuery, Searcher};
use crate::utils::cosine_similarity;

pub const DEFAULT_SIMILARITY: f32 = 0.6;

/// 按向量相似度过滤搜索结果
///
/// 下载每个候选链接并用自己的嵌入模型计算向量，与查询携带的源向量比较，
/// 因此该模型必须和生成源向量的模型处于同一向量空间。
#[derive(Debug, Clone)]
pub struct SimilarityFilter<S, E> {
    inner: S,
    embedder: E,
    client: reqwest::Client,
    threshold: f32,
}

impl<S: Searcher, E: Embedder> SimilarityFilter<S, E> {
    pub fn new(inner: S, embedder: E, threshold: f32) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self { inner, embedder, client, threshold })
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let is_image = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_ascii_lowercase().starts_with("image"));
        if !is_image {
            bail!("not an image");
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn score(&self, url: &str, reference: &[f32]) -> Result<f32> {
        let data = self.fetch_image(url).await?;
        let embedding = self.embedder.embed_bytes(data).await?;
        Ok(cosine_similarity(&embedding, reference))
    }
}

impl<S: Searcher, E: Embedder> Searcher for SimilarityFilter<S, E> {
    async fn find_links(&self, query: &SearchQuery<'_>) -> Result<Vec<String>> {
        let links = self.inner.find_links(query).await?;
        let Some(reference) = query.reference else {
            return Ok(links);
        };

        let mut kept = vec![];
        for link in links {
            match self.score(&link, reference).await {
                Ok(score) if score >= self.threshold => {
                    debug!("保留 {} (相似度 {:.3})", link, score);
                    kept.push(link);
                }
                Ok(score) => debug!("丢弃 {} (相似度 {:.3})", link, score),
                Err(e) => warn!("无法评估候选图片 {}: {}", link, e),
            }
        }
        Ok(kept)
    }
}
