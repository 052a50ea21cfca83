use anyhow::{Result, ensure};
use tokio::task::spawn_blocking;

use super::Embedder;
use crate::utils::l2_normalize;

/// 计算前先缩小到的边长
const THUMBNAIL_SIZE: u32 = 256;

/// RGB 颜色直方图嵌入，维度为 `bins³`
#[derive(Debug, Clone, Copy)]
pub struct HistogramEmbedder {
    bins: u32,
}

impl Default for HistogramEmbedder {
    fn default() -> Self {
        Self { bins: 8 }
    }
}

impl HistogramEmbedder {
    pub fn new(bins: u32) -> Result<Self> {
        ensure!((1..=64).contains(&bins), "bins 必须在 1 到 64 之间: {}", bins);
        Ok(Self { bins })
    }

    pub fn dimension(&self) -> usize {
        (self.bins * self.bins * self.bins) as usize
    }

    pub fn histogram(&self, data: &[u8]) -> Result<Vec<f32>> {
        let mut image = image::load_from_memory(data)?;
        if image.width() > THUMBNAIL_SIZE || image.height() > THUMBNAIL_SIZE {
            image = image.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE);
        }
        let image = image.to_rgb8();
        let bins = self.bins as usize;
        let mut hist = vec![0f32; self.dimension()];
        for pixel in image.pixels() {
            let [r, g, b] = pixel.0.map(|c| c as usize * bins / 256);
            hist[(r * bins + g) * bins + b] += 1.0;
        }
        Ok(l2_normalize(hist))
    }
}

impl Embedder for HistogramEmbedder {
    async fn embed_bytes(&self, data: Vec<u8>) -> Result<Vec<f32>> {
        let this = *self;
        spawn_blocking(move || this.histogram(&data)).await?
    }
}
