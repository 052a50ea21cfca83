use std::time::Duration;

use anyhow::{Result, bail};
use log::debug;
use serde::Deserialize;

use super::{SearchQuery, Searcher};

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// 单次请求允许的最大结果数
const MAX_NUM: usize = 10;

/// Google Custom Search 图片搜索
#[derive(Debug, Clone)]
pub struct GoogleSearcher {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    engine_id: String,
    file_type: Option<String>,
}

impl GoogleSearcher {
    pub fn new(api_key: impl Into<String>, engine_id: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            endpoint: ENDPOINT.to_string(),
            api_key: api_key.into(),
            engine_id: engine_id.into(),
            file_type: None,
        })
    }

    /// 限制结果的文件类型，例如 `png`
    pub fn file_type(mut self, file_type: Option<String>) -> Self {
        self.file_type = file_type;
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn params(&self, query: &SearchQuery<'_>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.text.to_string()),
            ("cx", self.engine_id.clone()),
            ("key", self.api_key.clone()),
            ("searchType", "image".to_string()),
            ("num", query.count.clamp(1, MAX_NUM).to_string()),
            ("imgColorType", "color".to_string()),
        ];
        if !query.size_hint.is_empty() {
            params.push(("imgSize", query.size_hint.to_string()));
        }
        if !query.type_hint.is_empty() {
            params.push(("imgType", query.type_hint.to_string()));
        }
        if let Some(file_type) = &self.file_type {
            params.push(("fileType", file_type.clone()));
        }
        params
    }
}

impl Searcher for GoogleSearcher {
    async fn find_links(&self, query: &SearchQuery<'_>) -> Result<Vec<String>> {
        debug!("搜索图片: {}", query.text);
        let resp = self.client.get(&self.endpoint).query(&self.params(query)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("custom search error {}: {}", status, text);
        }
        Ok(extract_links(resp.json::<SearchResponse>().await?))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    link: Option<String>,
}

pub fn extract_links(resp: SearchResponse) -> Vec<String> {
    resp.items.into_iter().filter_map(|item| item.link).filter(|l| !l.is_empty()).collect()
}
