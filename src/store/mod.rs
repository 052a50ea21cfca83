use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use log::{debug, info, warn};

pub mod codec;
pub mod merge;
pub mod model;
mod query;

pub use merge::MergeOutcome;
pub use model::*;
pub use query::*;

use crate::error::{CatalogError, Result};

/// 内存中的元数据表，每个标识只对应一条记录
///
/// 同一个存储文件不支持多个进程同时写入，后写入者会覆盖先写入者的结果。
#[derive(Debug, Default)]
pub struct MetadataStore {
    records: Vec<Record>,
    index: HashMap<Identity, usize>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从文件加载，文件不存在时返回空表
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => Self::from_reader(BufReader::new(file), path),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("元数据文件不存在，使用空表: {}", path.display());
                Ok(Self::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 从文件加载，文件必须存在
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => Self::from_reader(BufReader::new(file), path),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(CatalogError::NotFound(path.to_path_buf()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn from_reader(reader: impl std::io::Read, path: &Path) -> Result<Self> {
        let mut store = Self::new();
        for record in codec::read_records(reader)? {
            let identity = record.identity();
            if let MergeOutcome::Updated(_) = store.merge(identity.clone(), record) {
                warn!("重复的记录已合并: {}", identity);
            }
        }
        info!("加载元数据 {} 条: {}", store.len(), path.display());
        Ok(store)
    }

    /// 合并一条记录
    pub fn merge(&mut self, identity: Identity, mut incoming: Record) -> MergeOutcome {
        match self.index.get(&identity) {
            Some(&idx) => {
                let changed = merge::merge_record(&mut self.records[idx], incoming);
                debug!("更新 {}: {:?}", identity, changed);
                MergeOutcome::Updated(changed)
            }
            None => {
                incoming.search_links = codec::dedup_links(incoming.search_links);
                debug!("插入 {}", identity);
                self.index.insert(identity, self.records.len());
                self.records.push(incoming);
                MergeOutcome::Inserted
            }
        }
    }

    /// 以记录自身的标识合并
    pub fn upsert(&mut self, record: Record) -> MergeOutcome {
        self.merge(record.identity(), record)
    }

    /// 写出全部记录，先写临时文件再替换
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut tmp_file = path.as_os_str().to_owned();
        tmp_file.push(".tmp");

        let written = self
            .write_to(Path::new(&tmp_file))
            .and_then(|()| std::fs::rename(&tmp_file, path).map_err(CatalogError::from));
        if let Err(e) = written {
            if let Err(rm) = std::fs::remove_file(&tmp_file) {
                debug!("无法删除临时文件 {}: {}", Path::new(&tmp_file).display(), rm);
            }
            return Err(e);
        }

        info!("保存元数据 {} 条: {}", self.len(), path.display());
        Ok(())
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        codec::write_records(&mut writer, &self.records)?;
        writer.flush()?;
        Ok(())
    }

    pub fn get(&self, identity: &Identity) -> Option<&Record> {
        self.index.get(identity).map(|&idx| &self.records[idx])
    }

    /// 按插入顺序返回全部记录
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(dir: &str, name: &str, counts: u64, links: &[&str]) -> Record {
        Record {
            file_name: name.into(),
            directory: dir.into(),
            search_links: links.iter().map(|s| s.to_string()).collect(),
            img_counts: counts,
            ..Default::default()
        }
    }

    #[test]
    fn test_fresh_insert_normalizes_links() {
        let mut store = MetadataStore::new();
        let incoming = record("X", "a.png", 3, &["u1", "u1", "u2"]);
        assert_eq!(store.upsert(incoming), MergeOutcome::Inserted);

        let stored = store.get(&Identity::new("X", "a.png")).unwrap();
        assert_eq!(stored.search_links, vec!["u1", "u2"]);
        assert_eq!(stored.img_counts, 3);
    }

    #[test]
    fn test_one_record_per_identity() {
        let mut store = MetadataStore::new();
        store.upsert(record("X", "a.png", 1, &[]));
        store.upsert(record("X", "b.png", 1, &[]));
        let outcome = store.merge(Identity::from_path("X/a.png"), record("X", "a.png", 2, &[]));

        assert!(matches!(outcome, MergeOutcome::Updated(_)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[0].img_counts, 3);
    }
}
