//! 记录与 CSV 行之间的编解码

use std::collections::HashMap;
use std::io::{Read, Write};

use csv::StringRecord;
use log::warn;

use super::model::{Embedding, Record};
use crate::error::{CatalogError, Result};

/// 一行数据：列名 => 单元格文本
pub type Row = HashMap<String, String>;

pub const FILE_NAME: &str = "file_name";
pub const DIRECTORY: &str = "directory";
pub const EMBEDDING: &str = "embedding";
pub const SHORT_DESCRIPTION: &str = "short_description";
pub const LONG_DESCRIPTION: &str = "long_description";
pub const SEARCH_LINKS: &str = "search_links";
pub const OUTPUT_FILE_DIRECTORY: &str = "output_file_directory";
pub const IMG_COUNTS: &str = "img_counts";

/// 存储文件的固定列集合，同时也是写出时的列顺序
pub const COLUMNS: [&str; 8] = [
    FILE_NAME,
    DIRECTORY,
    EMBEDDING,
    SHORT_DESCRIPTION,
    LONG_DESCRIPTION,
    SEARCH_LINKS,
    OUTPUT_FILE_DIRECTORY,
    IMG_COUNTS,
];

/// 解析链接列表：JSON 数组优先，其次逗号分隔，空白则为空列表
///
/// 结果中重复的链接只保留第一次出现的位置。
pub fn parse_links(cell: &str) -> Vec<String> {
    let cell = cell.trim();
    if cell.is_empty() {
        return vec![];
    }
    let links = match cell.starts_with('[') {
        true => serde_json::from_str::<Vec<String>>(cell).ok(),
        false => None,
    };
    let links = links.unwrap_or_else(|| {
        cell.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
    });
    dedup_links(links)
}

pub fn dedup_links(links: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(links.len());
    for link in links {
        if !out.contains(&link) {
            out.push(link);
        }
    }
    out
}

pub fn encode_links(links: &[String]) -> String {
    serde_json::to_string(links).unwrap_or_else(|_| "[]".to_string())
}

/// 解析计数，无法解析时视为 0
pub fn parse_count(cell: &str) -> u64 {
    let cell = cell.trim();
    if cell.is_empty() {
        return 0;
    }
    match cell.parse() {
        Ok(n) => n,
        Err(_) => {
            warn!("无法解析 img_counts `{}`，按 0 处理", cell);
            0
        }
    }
}

pub fn decode_row(row: &Row) -> Result<Record> {
    if let Some(key) = row.keys().find(|k| !COLUMNS.contains(&k.as_str())) {
        return Err(CatalogError::MalformedRow(format!("unexpected column `{}`", key)));
    }
    let cell = |name: &str| row.get(name).map(String::as_str).unwrap_or_default();

    let file_name = match row.get(FILE_NAME) {
        Some(name) if !name.is_empty() => name.clone(),
        _ => return Err(CatalogError::MalformedRow(format!("missing `{}`", FILE_NAME))),
    };
    let Some(directory) = row.get(DIRECTORY) else {
        return Err(CatalogError::MalformedRow(format!("missing `{}`", DIRECTORY)));
    };

    Ok(Record {
        file_name,
        directory: directory.clone(),
        embedding: Embedding::from_cell(cell(EMBEDDING)),
        short_description: cell(SHORT_DESCRIPTION).to_string(),
        long_description: cell(LONG_DESCRIPTION).to_string(),
        search_links: parse_links(cell(SEARCH_LINKS)),
        output_file_directory: cell(OUTPUT_FILE_DIRECTORY).to_string(),
        img_counts: parse_count(cell(IMG_COUNTS)),
    })
}

pub fn encode_row(record: &Record) -> Row {
    encode_cells(record).into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// 按 `COLUMNS` 顺序编码
fn encode_cells(record: &Record) -> [(&'static str, String); 8] {
    [
        (FILE_NAME, record.file_name.clone()),
        (DIRECTORY, record.directory.clone()),
        (EMBEDDING, record.embedding.to_cell().into_owned()),
        (SHORT_DESCRIPTION, record.short_description.clone()),
        (LONG_DESCRIPTION, record.long_description.clone()),
        (SEARCH_LINKS, encode_links(&record.search_links)),
        (OUTPUT_FILE_DIRECTORY, record.output_file_directory.clone()),
        (IMG_COUNTS, record.img_counts.to_string()),
    ]
}

/// 读取整个表格
///
/// 表头有未知列或缺少标识列时整体失败；单行格式错误只跳过该行。
pub fn read_records<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = reader.headers()?.iter().map(|h| h.trim().to_string()).collect::<Vec<_>>();
    if headers.iter().all(|h| h.is_empty()) {
        return Ok(vec![]);
    }
    if let Some(unknown) = headers.iter().find(|h| !COLUMNS.contains(&h.as_str())) {
        return Err(CatalogError::Schema(format!("unknown column `{}`", unknown)));
    }
    for required in [FILE_NAME, DIRECTORY] {
        if !headers.iter().any(|h| h == required) {
            return Err(CatalogError::Schema(format!("missing column `{}`", required)));
        }
    }

    let mut records = vec![];
    for (idx, result) in reader.byte_records().enumerate() {
        let line = idx + 2;
        let fields = match StringRecord::from_byte_record(result?) {
            Ok(fields) => fields,
            Err(e) => {
                warn!("跳过第 {} 行: {}", line, e.utf8_error());
                continue;
            }
        };
        if fields.len() > headers.len() {
            warn!("跳过第 {} 行: 单元格数量 {} 超过表头 {}", line, fields.len(), headers.len());
            continue;
        }
        let row = headers
            .iter()
            .zip(fields.iter())
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect::<Row>();
        match decode_row(&row) {
            Ok(record) => records.push(record),
            Err(e) => warn!("跳过第 {} 行: {}", line, e),
        }
    }
    Ok(records)
}

pub fn write_records<'a, W, I>(writer: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Record>,
{
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.write_record(encode_cells(record).iter().map(|(_, v)| v.as_str()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn sample() -> Record {
        Record {
            file_name: "a.png".into(),
            directory: "X".into(),
            embedding: Embedding::Vector(vec![0.6, 0.8]),
            short_description: "red cake".into(),
            long_description: "a red cake, with \"cream\" on top".into(),
            search_links: vec!["http://u1".into(), "http://u2".into()],
            output_file_directory: "out/a".into(),
            img_counts: 7,
        }
    }

    #[test]
    fn test_parse_links_json() {
        assert_eq!(parse_links(r#"["u1", "u2"]"#), vec!["u1", "u2"]);
    }

    #[test]
    fn test_parse_links_comma() {
        assert_eq!(parse_links("u1, u2,,u3 "), vec!["u1", "u2", "u3"]);
    }

    #[test]
    fn test_parse_links_broken_json_falls_back() {
        assert_eq!(parse_links("[u1,u2"), vec!["[u1", "u2"]);
    }

    #[test]
    fn test_parse_links_empty_and_dedup() {
        assert!(parse_links("").is_empty());
        assert!(parse_links("[]").is_empty());
        assert_eq!(parse_links(r#"["a","b","a"]"#), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_count_tolerates_garbage() {
        assert_eq!(parse_count("12"), 12);
        assert_eq!(parse_count(" 3 "), 3);
        assert_eq!(parse_count("abc"), 0);
        assert_eq!(parse_count("-1"), 0);
        assert_eq!(parse_count(""), 0);
    }

    #[test]
    fn test_round_trip() {
        let record = sample();
        assert_eq!(decode_row(&encode_row(&record)).unwrap(), record);
    }

    #[test]
    fn test_encode_row_forms() {
        let encoded = encode_row(&sample());
        assert_eq!(encoded[SEARCH_LINKS], r#"["http://u1","http://u2"]"#);
        assert_eq!(encoded[EMBEDDING], "[0.6,0.8]");
        assert_eq!(encoded[IMG_COUNTS], "7");
    }

    #[test]
    fn test_encode_passes_encoded_embedding_through() {
        let mut record = sample();
        record.embedding = Embedding::from_cell("[1, 2]");
        assert_eq!(encode_row(&record)[EMBEDDING], "[1, 2]");
    }

    #[test]
    fn test_decode_defaults_missing_fields() {
        let record = decode_row(&row(&[(FILE_NAME, "a.png"), (DIRECTORY, "X")])).unwrap();
        assert_eq!(record, Record { file_name: "a.png".into(), directory: "X".into(), ..Default::default() });
    }

    #[test]
    fn test_decode_missing_identity() {
        let err = decode_row(&row(&[(FILE_NAME, "a.png")])).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedRow(_)));
        let err = decode_row(&row(&[(DIRECTORY, "X"), (FILE_NAME, "")])).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedRow(_)));
    }

    #[test]
    fn test_decode_rejects_unknown_column() {
        let err =
            decode_row(&row(&[(FILE_NAME, "a.png"), (DIRECTORY, "X"), ("extra", "1")])).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedRow(_)));
    }

    #[test]
    fn test_read_strips_header_whitespace() {
        let data = " file_name , directory ,img_counts\na.png,X,2\n";
        let records = read_records(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].file_name, "a.png");
        assert_eq!(records[0].img_counts, 2);
    }

    #[test]
    fn test_read_skips_malformed_rows() {
        let data = "file_name,directory\na.png,X\n,X\nb.png,Y,extra\nc.png,Z\n";
        let records = read_records(data.as_bytes()).unwrap();
        let names = records.iter().map(|r| r.file_name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["a.png", "c.png"]);
    }

    #[test]
    fn test_read_skips_invalid_utf8_row() {
        let data = b"file_name,directory,img_counts\na.png,X,1\nb\xff.png,X,1\nc.png,X,1\n";
        let records = read_records(&data[..]).unwrap();
        let names = records.iter().map(|r| r.file_name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["a.png", "c.png"]);
    }

    #[test]
    fn test_read_rejects_unknown_header() {
        let data = "file_name,directory,color\na.png,X,red\n";
        assert!(matches!(read_records(data.as_bytes()), Err(CatalogError::Schema(_))));
    }

    #[test]
    fn test_read_rejects_missing_identity_header() {
        let data = "file_name,img_counts\na.png,1\n";
        assert!(matches!(read_records(data.as_bytes()), Err(CatalogError::Schema(_))));
    }

    #[test]
    fn test_write_then_read() {
        let records = vec![sample(), Record::skeleton("Y/b.jpg")];
        let mut buf = vec![];
        write_records(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with(&COLUMNS.join(",")));
        assert_eq!(read_records(buf.as_slice()).unwrap(), records);
    }
}
