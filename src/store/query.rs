//! 已加载元数据表上的查询

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use clap::ValueEnum;
use log::info;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use super::codec::{self, COLUMNS};
use super::model::Record;
use super::MetadataStore;
use crate::error::Result;

static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

const STOPWORDS: [&str; 14] =
    ["a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "with", "by", "of"];

/// 可检索的描述字段
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionField {
    Short,
    Long,
}

impl DescriptionField {
    fn of(self, record: &Record) -> &str {
        match self {
            Self::Short => &record.short_description,
            Self::Long => &record.long_description,
        }
    }
}

/// 元数据表的统计信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_images: usize,
    pub unique_directories: usize,
    pub avg_links_per_image: f64,
    pub images_without_links: usize,
    pub most_common_words: Vec<(String, usize)>,
}

impl MetadataStore {
    /// 按文件名查找第一条记录
    pub fn find_by_file_name(&self, file_name: &str) -> Option<&Record> {
        self.records().iter().find(|r| r.file_name == file_name)
    }

    pub fn nth(&self, index: usize) -> Option<&Record> {
        self.records().get(index)
    }

    pub fn search_links(&self, file_name: &str) -> &[String] {
        self.find_by_file_name(file_name).map(|r| r.search_links.as_slice()).unwrap_or_default()
    }

    /// 描述中包含关键字（忽略大小写）的记录
    pub fn filter_by_description(&self, query: &str, field: DescriptionField) -> Vec<&Record> {
        let query = query.to_lowercase();
        self.records().iter().filter(|r| field.of(r).to_lowercase().contains(&query)).collect()
    }

    pub fn group_by_directory(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped = BTreeMap::<&str, Vec<&str>>::new();
        for record in self.records() {
            grouped.entry(&record.directory).or_default().push(&record.file_name);
        }
        grouped
    }

    /// 去重后的非空输出目录，保持出现顺序
    pub fn output_directories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.records()
            .iter()
            .map(|r| r.output_file_directory.as_str())
            .filter(|d| !d.is_empty() && seen.insert(*d))
            .collect()
    }

    /// 详细描述与目标图片相似的其他记录，按相似度从高到低排序
    pub fn similar_descriptions(&self, file_name: &str, threshold: f64) -> Vec<(f64, &Record)> {
        let Some(target) = self.find_by_file_name(file_name) else {
            return vec![];
        };
        let target_desc = &target.long_description;
        let mut results = self
            .records()
            .iter()
            .filter(|r| r.identity() != target.identity())
            .filter_map(|r| {
                if r.long_description.is_empty() || target_desc.is_empty() {
                    return None;
                }
                let score = strsim::normalized_levenshtein(&r.long_description, target_desc);
                (score >= threshold).then_some((score, r))
            })
            .collect::<Vec<_>>();
        results.sort_by(|a, b| b.0.total_cmp(&a.0));
        results
    }

    pub fn summary(&self) -> Summary {
        let records = self.records();
        let total_links = records.iter().map(|r| r.img_counts).sum::<u64>();
        Summary {
            total_images: records.len(),
            unique_directories: self.group_by_directory().len(),
            avg_links_per_image: match records.len() {
                0 => 0.,
                n => total_links as f64 / n as f64,
            },
            images_without_links: records.iter().filter(|r| r.img_counts == 0).count(),
            most_common_words: self.common_words(DescriptionField::Short, 10),
        }
    }

    /// 出现次数最多的词，次数相同时按字母顺序
    pub fn common_words(&self, field: DescriptionField, top_n: usize) -> Vec<(String, usize)> {
        let mut counter = HashMap::<String, usize>::new();
        for record in self.records() {
            let text = field.of(record).to_lowercase();
            for word in RE_WORD.find_iter(&text).map(|m| m.as_str()) {
                if word.chars().count() > 2 && !STOPWORDS.contains(&word) {
                    *counter.entry(word.to_string()).or_default() += 1;
                }
            }
        }
        let mut words = counter.into_iter().collect::<Vec<_>>();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(top_n);
        words
    }
}

/// 记录中选定的列，附带 `full_path`
///
/// `fields` 为空时返回全部列，未知的列名被忽略。
pub fn row_properties(record: &Record, fields: &[String]) -> Map<String, Value> {
    let mut row = codec::encode_row(record);
    let mut props = Map::new();
    for column in COLUMNS {
        if !fields.is_empty() && !fields.iter().any(|f| f == column) {
            continue;
        }
        let Some(cell) = row.remove(column) else { continue };
        let value = match column {
            codec::EMBEDDING => record
                .embedding
                .to_vector()
                .map(|v| Value::from(v.into_iter().map(f64::from).collect::<Vec<_>>()))
                .unwrap_or(Value::String(cell)),
            codec::SEARCH_LINKS => Value::from(record.search_links.clone()),
            codec::IMG_COUNTS => Value::from(record.img_counts),
            _ => Value::String(cell),
        };
        props.insert(column.to_string(), value);
    }
    if props.contains_key(codec::FILE_NAME) && props.contains_key(codec::DIRECTORY) {
        props.insert("full_path".to_string(), Value::String(record.identity().to_string()));
    }
    props
}

pub fn image_paths<'a>(records: impl IntoIterator<Item = &'a Record>) -> Vec<PathBuf> {
    records.into_iter().map(|r| PathBuf::from(r.identity().as_str())).collect()
}

/// 将部分记录导出为与存储相同格式的 CSV
pub fn export<'a>(records: impl IntoIterator<Item = &'a Record>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    codec::write_records(&mut writer, records)?;
    writer.flush()?;
    info!("导出完成: {}", path.display());
    Ok(())
}
