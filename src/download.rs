use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use log::{debug, warn};

/// 把搜索结果下载到记录的输出目录
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client })
    }

    /// 依次保存为 `downloaded_{idx}.jpg`，单个链接失败只记录警告
    pub async fn download_all(&self, links: &[String], dir: &Path) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir).await?;
        let mut saved = vec![];
        for (idx, url) in links.iter().enumerate() {
            let dest = dir.join(format!("downloaded_{}.jpg", idx));
            match self.download(url, &dest).await {
                Ok(()) => {
                    debug!("已下载 {} -> {}", url, dest.display());
                    saved.push(dest);
                }
                Err(e) => warn!("下载失败 {}: {}", url, e),
            }
        }
        Ok(saved)
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let data = resp.bytes().await?;
        tokio::fs::write(dest, &data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_links_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("cake");
        let links = vec!["http://127.0.0.1:9/a.jpg".to_string(), "not a url".to_string()];

        let saved = Downloader::new().unwrap().download_all(&links, &out).await.unwrap();
        assert!(saved.is_empty());
        assert!(out.is_dir());
    }
}
