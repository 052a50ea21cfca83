use super::codec::{
    EMBEDDING, IMG_COUNTS, LONG_DESCRIPTION, OUTPUT_FILE_DIRECTORY, SEARCH_LINKS,
    SHORT_DESCRIPTION,
};
use super::model::Record;

/// 一次合并的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// 新插入的记录
    Inserted,
    /// 已有记录，附带发生变化的列
    Updated(Vec<&'static str>),
}

/// 将新记录合并到已有记录
///
/// * `img_counts` 累加
/// * `search_links` 取并集，保留已有顺序，追加未出现过的链接
/// * 其他列只有在新值非空且与旧值不同时才覆盖
pub fn merge_record(existing: &mut Record, incoming: Record) -> Vec<&'static str> {
    let mut changed = vec![];

    if incoming.img_counts > 0 {
        existing.img_counts = existing.img_counts.saturating_add(incoming.img_counts);
        changed.push(IMG_COUNTS);
    }

    let before = existing.search_links.len();
    for link in incoming.search_links {
        if !existing.search_links.contains(&link) {
            existing.search_links.push(link);
        }
    }
    if existing.search_links.len() != before {
        changed.push(SEARCH_LINKS);
    }

    if !incoming.embedding.is_empty() && incoming.embedding != existing.embedding {
        existing.embedding = incoming.embedding;
        changed.push(EMBEDDING);
    }
    if replace_text(&mut existing.short_description, incoming.short_description) {
        changed.push(SHORT_DESCRIPTION);
    }
    if replace_text(&mut existing.long_description, incoming.long_description) {
        changed.push(LONG_DESCRIPTION);
    }
    if replace_text(&mut existing.output_file_directory, incoming.output_file_directory) {
        changed.push(OUTPUT_FILE_DIRECTORY);
    }

    changed
}

fn replace_text(existing: &mut String, incoming: String) -> bool {
    if incoming.is_empty() || *existing == incoming {
        return false;
    }
    *existing = incoming;
    true
}
