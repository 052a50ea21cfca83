use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use log::debug;
use serde::Deserialize;
use serde_json::json;

use super::{DescribeRequest, Describer, Description};

const SYSTEM_MESSAGE: &str = "You are an expert in visual image analysis.";

const OUTPUT_FORMAT: &str = "The answer must follow this EXACT format:\n1:\n[Concise description, at most 15 words]\n\n2:\n[Detailed description, at most 30 words]";

/// 向量在提示词中保留的维度数
const PROMPT_DIMS: usize = 20;

/// 提示词模板对应的图片类别
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImageType {
    General,
    #[default]
    Product,
    Person,
    Landscape,
}

impl ImageType {
    fn template(self) -> &'static str {
        match self {
            Self::General => "Write a detailed and specific description suitable for finding similar images on the web.",
            Self::Product => "Describe this product with specific terms, including its distinguishing features. For bakery, pastry or confectionery products use phrasing such as 'Round rustic loaf with a golden crust and star-shaped scoring' or 'Flaky layered croissant with a light golden texture'. Mention key visual details: texture, shape, colours and any distinctive pattern or decoration.",
            Self::Person => "Describe this person using key visual details: facial features, clothing style, posture and surroundings.",
            Self::Landscape => "Describe this landscape with specific details: weather, vegetation, lighting and any relevant architectural or natural element.",
        }
    }
}

/// OpenAI 兼容的 chat completions 描述生成器
#[derive(Debug, Clone)]
pub struct ChatDescriber {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    image_type: ImageType,
}

impl ChatDescriber {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            max_tokens: 300,
            image_type: ImageType::default(),
        })
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn image_type(mut self, image_type: ImageType) -> Self {
        self.image_type = image_type;
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut req = self.client.post(&url);
        if let Some(key) = self.api_key.as_deref() {
            req = req.bearer_auth(key);
        }
        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [
                {"role": "system", "content": SYSTEM_MESSAGE},
                {"role": "user", "content": prompt},
            ],
        });

        let resp = req.json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("chat completion error {}: {}", status, text);
        }
        let resp = resp.json::<ChatResponse>().await?;
        let content = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("chat completion returned no content")?;
        Ok(content.trim().to_string())
    }
}

impl Describer for ChatDescriber {
    async fn describe(&self, request: &DescribeRequest<'_>) -> Result<Description> {
        let prompt = build_prompt(request, self.image_type);
        let text = self.complete(&prompt).await?;
        debug!("模型回复: {}", text);
        Ok(parse_response(&text))
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

pub fn build_prompt(request: &DescribeRequest<'_>, image_type: ImageType) -> String {
    let dims = request
        .embedding
        .iter()
        .take(PROMPT_DIMS)
        .map(|x| format!("{:.16}", x))
        .collect::<Vec<_>>()
        .join(", ");
    let context = request
        .extra_context
        .filter(|s| !s.is_empty())
        .map(|s| format!("\nAdditional context: {}", s))
        .unwrap_or_default();
    let theme = request
        .theme
        .filter(|s| !s.is_empty())
        .map(|s| format!("\nApply the following theme to the description: {}", s))
        .unwrap_or_default();
    let tips = match request.engine_hint {
        "google_images" => "Optimise for Google Images using specific terms.",
        _ => "",
    };
    format!(
        "Vector representation of an image:\n[{}]\n{}{}\n\n{}\n\n{}\n\n{}",
        dims,
        context,
        theme,
        image_type.template(),
        tips,
        OUTPUT_FORMAT
    )
}

/// 拆分 `1:` / `2:` 格式的回复
///
/// 无法拆成两段时，简短描述取前 100 个字符，详细描述为完整回复。
pub fn parse_response(text: &str) -> Description {
    let marker = if text.contains("1.") && text.contains("2.") {
        "2."
    } else if text.contains("1:") && text.contains("2:") {
        "2:"
    } else {
        "\n\n2:"
    };
    let parts = text.split(marker).collect::<Vec<_>>();
    match parts.as_slice() {
        [short, long] => Description { short: clean(short), long: clean(long) },
        _ => Description { short: text.chars().take(100).collect(), long: text.to_string() },
    }
}

fn clean(text: &str) -> String {
    ["1.", "1:", "2.", "2:"].iter().fold(text.to_string(), |acc, m| acc.replace(m, "")).trim().to_string()
}
