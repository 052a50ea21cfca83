use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

/// 记录的唯一标识，等价于 `directory/file_name` 组成的完整路径
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    pub fn new(directory: &str, file_name: &str) -> Self {
        Self::from_path(Path::new(directory).join(file_name))
    }

    /// 路径中多余的 `/` 和中间的 `.` 会被去掉
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self(normalize(path.as_ref()).to_string_lossy().into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components().collect()
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 图片嵌入向量
///
/// 从存储中读出时保持原始文本，只有真正需要向量的调用方才去解析。
#[derive(Debug, Clone, Default)]
pub enum Embedding {
    #[default]
    Empty,
    Vector(Vec<f32>),
    Encoded(String),
}

impl Embedding {
    pub fn from_cell(cell: &str) -> Self {
        if cell.trim().is_empty() { Self::Empty } else { Self::Encoded(cell.to_string()) }
    }

    /// 序列化为单元格文本，向量编码为 JSON 数组，已编码的文本原样返回
    pub fn to_cell(&self) -> Cow<'_, str> {
        match self {
            Self::Empty => Cow::Borrowed(""),
            Self::Vector(v) => Cow::Owned(serde_json::to_string(v).unwrap_or_default()),
            Self::Encoded(s) => Cow::Borrowed(s),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Vector(v) => v.is_empty(),
            Self::Encoded(s) => s.trim().is_empty(),
        }
    }

    pub fn to_vector(&self) -> Result<Vec<f32>, serde_json::Error> {
        match self {
            Self::Empty => Ok(vec![]),
            Self::Vector(v) => Ok(v.clone()),
            Self::Encoded(s) => serde_json::from_str(s),
        }
    }
}

impl PartialEq for Embedding {
    fn eq(&self, other: &Self) -> bool {
        self.to_cell() == other.to_cell()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(v: Vec<f32>) -> Self {
        Self::Vector(v)
    }
}

/// 单张图片的元数据记录
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    /// 文件名
    pub file_name: String,
    /// 所在目录
    pub directory: String,
    /// 图片嵌入向量
    pub embedding: Embedding,
    /// 简短描述，约定不超过 15 个词
    pub short_description: String,
    /// 详细描述，约定不超过 30 个词
    pub long_description: String,
    /// 搜索到的图片链接，无重复，跨多次运行累加
    pub search_links: Vec<String>,
    /// 下载结果的输出目录
    pub output_file_directory: String,
    /// 累计找到的链接数量
    pub img_counts: u64,
}

impl Record {
    /// 只包含路径信息的空白记录
    pub fn skeleton(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self {
            file_name: path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            directory: path
                .parent()
                .map(|s| normalize(s).to_string_lossy().into_owned())
                .unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn identity(&self) -> Identity {
        Identity::new(&self.directory, &self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_identity_matches_path() {
        let record = Record::skeleton("/data/images/a.png");
        assert_eq!(record.file_name, "a.png");
        assert_eq!(record.directory, "/data/images");
        assert_eq!(record.identity(), Identity::from_path("/data/images/a.png"));
    }

    #[test]
    fn test_identity_ignores_redundant_separators() {
        let record = Record::skeleton("/data/src/./nested//c.jpg");
        assert_eq!(record.directory, "/data/src/nested");
        assert_eq!(record.identity(), Identity::from_path("/data/src//nested/./c.jpg"));
        assert_eq!(record.identity(), Identity::new("/data/src/", "nested/c.jpg"));
    }

    #[test]
    fn test_skeleton_relative_file() {
        let record = Record::skeleton("a.png");
        assert_eq!(record.directory, "");
        assert_eq!(record.identity().as_str(), "a.png");
    }

    #[test]
    fn test_embedding_equality_by_cell() {
        let vector = Embedding::Vector(vec![0.5, -0.25]);
        let encoded = Embedding::from_cell("[0.5,-0.25]");
        assert_eq!(vector, encoded);
        assert_eq!(encoded.to_vector().unwrap(), vec![0.5, -0.25]);
    }

    #[test]
    fn test_embedding_blank_cell_is_empty() {
        assert!(Embedding::from_cell("  ").is_empty());
        assert!(Embedding::Vector(vec![]).is_empty());
        assert!(!Embedding::from_cell("[1.0]").is_empty());
    }
}
