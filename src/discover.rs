use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, warn};
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{CatalogError, Result};

pub const DEFAULT_SUFFIX: &str = "png,jpg,jpeg,bmp,gif";

/// 文件序号范围，左闭右开，越界时截断
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl FileRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end: Some(end) }
    }
}

impl FromStr for FileRange {
    type Err = String;

    /// 支持 `A:B`、`A:`、`:B` 以及 `A..B` 写法
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(':')
            .or_else(|| s.split_once(".."))
            .ok_or_else(|| format!("无效的范围: {}", s))?;
        let parse = |v: &str| v.trim().parse::<usize>().map_err(|_| format!("无效的范围: {}", s));
        let start = match start.trim() {
            "" => 0,
            v => parse(v)?,
        };
        let end = match end.trim() {
            "" => None,
            v => Some(parse(v)?),
        };
        Ok(Self { start, end })
    }
}

impl fmt::Display for FileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}:{}", self.start, end),
            None => write!(f, "{}:", self.start),
        }
    }
}

/// 图片文件扫描器
#[derive(Debug, Clone)]
pub struct Discoverer {
    re_suf: Regex,
}

impl Default for Discoverer {
    fn default() -> Self {
        Self::from_str(DEFAULT_SUFFIX).unwrap_or_else(|e| match e {})
    }
}

impl FromStr for Discoverer {
    type Err = Infallible;

    /// 由逗号分隔的后缀名构造，忽略大小写
    fn from_str(suffix: &str) -> Result<Self, Self::Err> {
        let alternatives = suffix
            .split(',')
            .map(|s| s.trim().trim_start_matches('.'))
            .filter(|s| !s.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        let re_suf = Regex::new(&format!("(?i)^({})$", alternatives)).expect("failed to build regex");
        Ok(Self { re_suf })
    }
}

impl Discoverer {
    /// 递归扫描目录，返回按路径字典序排列的图片文件
    pub fn discover(&self, root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(CatalogError::NotFound(root.to_path_buf()));
        }
        info!("开始扫描目录: {}", root.display());

        let mut entries = WalkDir::new(root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("扫描出错: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && self.matches(entry.path()))
            .map(|entry| entry.into_path())
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

        info!("扫描完成，共 {} 张图片", entries.len());
        Ok(entries)
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| self.re_suf.is_match(&ext.to_string_lossy()))
    }
}

/// 截取范围内的文件，语义同 Python 切片
pub fn slice(paths: Vec<PathBuf>, range: Option<FileRange>) -> Vec<PathBuf> {
    let Some(range) = range else {
        return paths;
    };
    let len = paths.len();
    let end = range.end.unwrap_or(len).min(len);
    let start = range.start.min(end);
    paths.into_iter().skip(start).take(end - start).collect()
}
