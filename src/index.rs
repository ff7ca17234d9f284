use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::{ANNOTATIONS_DIR, IMAGES_DIR, annotation_file_name};
use crate::store::Record;

/// 索引中的一项，路径均相对于导出根目录
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    pub image: String,
    pub annotation: String,
}

impl IndexEntry {
    /// 根据图片路径生成索引项，无法取得文件名时返回 None
    pub fn for_frame(frame_path: &Path) -> Option<Self> {
        let image = frame_path.file_name()?.to_string_lossy();
        let annotation = annotation_file_name(frame_path)?;
        Some(Self {
            image: format!("{}/{}", IMAGES_DIR, image),
            annotation: format!("{}/{}", ANNOTATIONS_DIR, annotation),
        })
    }
}

/// 由记录集合生成索引，保持记录顺序
pub fn build_index<'a, I>(records: I) -> Vec<IndexEntry>
where
    I: IntoIterator<Item = &'a Record>,
{
    records.into_iter().filter_map(|record| IndexEntry::for_frame(&record.frame_path)).collect()
}

/// 写入索引文件，整体覆盖
pub fn write_index(path: impl AsRef<Path>, entries: &[IndexEntry]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, entries)?;
    writer.flush()?;
    Ok(())
}

pub fn read_index(path: impl AsRef<Path>) -> Result<Vec<IndexEntry>> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use super::*;

    fn record(path: &str) -> Record {
        Record::new(PathBuf::from(path), BTreeMap::new())
    }

    #[test]
    fn test_entry_for_frame() {
        let entry = IndexEntry::for_frame(Path::new("image_raw/a.jpg")).unwrap();
        assert_eq!(entry.image, "images/a.jpg");
        assert_eq!(entry.annotation, "annotations/a.json");
        assert!(IndexEntry::for_frame(Path::new("")).is_none());
    }

    #[test]
    fn test_build_index_keeps_order() {
        let records = [record("raw/b.png"), record("raw/a.jpg"), record("")];
        let index = build_index(&records);
        let images = index.iter().map(|e| e.image.as_str()).collect::<Vec<_>>();
        assert_eq!(images, ["images/b.png", "images/a.jpg"]);
    }

    #[test]
    fn test_write_and_read_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        write_index(&path, &[]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");

        let entries = build_index(&[record("x/a.jpg")]);
        write_index(&path, &entries).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  {\n    \"image\": \"images/a.jpg\""));
        assert_eq!(read_index(&path).unwrap(), entries);
    }
}
