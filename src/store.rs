use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::index::{IndexEntry, build_index, read_index, write_index};
use crate::layout::{ExportLayout, INDEX_FILE};
use crate::metrics;
use crate::schema::{FRAME_PATH, FieldType, RECORD_ID, Schema};
use crate::utils::copy_preserving;
use crate::value::FieldValue;

/// 标注记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// 记录 ID，由图片文件名生成
    pub id: Uuid,
    /// 原始图片路径
    pub frame_path: PathBuf,
    /// 字段值，不包含 `id` 和 `frame_path`
    pub values: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(frame_path: PathBuf, values: BTreeMap<String, FieldValue>) -> Self {
        Self { id: record_id(&frame_path), frame_path, values }
    }
}

/// 记录 ID 由图片文件名决定，重新加载后保持不变
pub fn record_id(frame_path: &Path) -> Uuid {
    let name = frame_path.file_name().unwrap_or(frame_path.as_os_str());
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_encoded_bytes())
}

/// 一次保存的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub id: Uuid,
    /// 是否新建了记录
    pub created: bool,
}

/// 重新加载时跳过的索引项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReloadIssue {
    /// 图片或标注文件不存在
    FileNotFound { path: String },
    /// 文件存在但读取失败
    Unreadable { path: String, message: String },
    /// 标注文件不是合法的 JSON 对象
    Parse { path: String, message: String },
}

impl ReloadIssue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "file_not_found",
            Self::Unreadable { .. } => "unreadable",
            Self::Parse { .. } => "parse",
        }
    }

    fn not_found(path: &Path) -> Self {
        Self::FileNotFound { path: path.display().to_string() }
    }
}

/// 重新加载的汇总信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReloadReport {
    /// 成功加载的记录数
    pub loaded: usize,
    /// 新推断出的字段
    pub inferred_fields: Vec<String>,
    pub issues: Vec<ReloadIssue>,
}

/// 导出目录的文件统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub images: usize,
    pub annotations: usize,
    pub index_entries: usize,
}

/// 标注存储
///
/// 内存中的记录集合是唯一的数据来源，每次修改后都会同步写入导出目录：
/// 先复制图片，再写标注文件，最后整体重建索引。
#[derive(Debug)]
pub struct AnnotationStore {
    layout: ExportLayout,
    schema: Schema,
    records: Vec<Record>,
    /// 原始图片目录，重新加载时用于恢复 `frame_path`
    image_dir: Option<PathBuf>,
}

impl AnnotationStore {
    pub fn new(layout: ExportLayout, schema: Schema) -> Self {
        Self { layout, schema, records: vec![], image_dir: None }
    }

    pub fn with_image_dir(mut self, image_dir: impl Into<PathBuf>) -> Self {
        self.image_dir = Some(image_dir.into());
        self
    }

    /// 创建导出目录，若索引存在则从磁盘加载
    pub fn open(
        layout: ExportLayout,
        schema: Schema,
        image_dir: Option<PathBuf>,
    ) -> Result<(Self, Option<ReloadReport>)> {
        layout.ensure()?;
        let mut store = Self { layout, schema, records: vec![], image_dir };
        let index_file = store.layout.index_file();
        if !index_file.exists() {
            return Ok((store, None));
        }
        let report = match store.reload_from_disk() {
            Ok(report) => report,
            // 索引无法解析时以空数据集打开，之后的保存或清空会重写索引
            Err(StoreError::Json(e)) => {
                warn!("索引文件无法解析: {}: {}", index_file.display(), e);
                let issue = ReloadIssue::Parse {
                    path: index_file.display().to_string(),
                    message: e.to_string(),
                };
                metrics::inc_reload_issue(issue.kind());
                ReloadReport { issues: vec![issue], ..Default::default() }
            }
            Err(e) => return Err(e),
        };
        Ok((store, Some(report)))
    }

    pub fn layout(&self) -> &ExportLayout {
        &self.layout
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn find(&self, frame_path: impl AsRef<Path>) -> Option<&Record> {
        let frame_path = frame_path.as_ref();
        self.records.iter().find(|r| r.frame_path == frame_path)
    }

    pub fn get(&self, id: Uuid) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// 定义新字段
    pub fn define_field(&mut self, name: &str, field_type: FieldType, required: bool) -> Result<()> {
        let field = self.schema.define(name, field_type, required)?;
        info!("添加字段: {} ({})", field.name, field.field_type);
        Ok(())
    }

    /// 删除字段，同时从所有记录中移除该字段并重写标注文件
    ///
    /// 返回重写的标注文件数量
    pub fn remove_field(&mut self, name: &str) -> Result<usize> {
        if self.schema.remove(name)?.is_none() {
            debug!("字段不存在: {}", name);
        }
        for record in &mut self.records {
            record.values.remove(name);
        }
        let mut rewritten = 0;
        for record in &self.records {
            if self.write_annotation(record)? {
                rewritten += 1;
            }
        }
        info!("删除字段: {}，重写 {} 个标注文件", name, rewritten);
        Ok(rewritten)
    }

    /// 按类型检查并转换输入值
    fn normalize<I>(&self, values: I) -> Result<BTreeMap<String, FieldValue>>
    where
        I: IntoIterator<Item = (String, FieldValue)>,
    {
        let mut normalized = BTreeMap::new();
        for (name, value) in values {
            let field = self
                .schema
                .annotation_field(&name)
                .ok_or_else(|| StoreError::UnknownField(name.clone()))?;
            let value = value.coerce(field.field_type).map_err(|value| StoreError::TypeMismatch {
                field: name.clone(),
                expected: field.field_type,
                found: value.field_type(),
            })?;
            if !value.is_finite() {
                return Err(StoreError::InvalidValue {
                    field: name,
                    value: value.display(),
                    expected: field.field_type,
                });
            }
            normalized.insert(name, value);
        }
        Ok(normalized)
    }

    /// 保存一张图片的标注
    ///
    /// 按 `frame_path` 查找记录，存在则合并新值，否则新建记录。随后依次：
    /// 1. 将图片复制到导出目录（已存在同名文件时跳过）
    /// 2. 写入标注文件
    /// 3. 重建索引
    ///
    /// 图片复制失败时，内存中的记录会回滚到保存前的状态。
    pub fn upsert<P, I>(&mut self, frame_path: P, values: I) -> Result<SaveOutcome>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = (String, FieldValue)>,
    {
        let frame_path = frame_path.as_ref();
        if IndexEntry::for_frame(frame_path).is_none() {
            return Err(StoreError::InvalidFramePath(frame_path.to_path_buf()));
        }
        let values = self.normalize(values)?;

        let position = self.records.iter().position(|r| r.frame_path == frame_path);
        let snapshot = position.map(|i| self.records[i].clone());
        let index = match position {
            Some(i) => {
                self.records[i].values.extend(values);
                i
            }
            None => {
                self.records.push(Record::new(frame_path.to_path_buf(), values));
                self.records.len() - 1
            }
        };

        if let Err(e) = self.copy_image(frame_path) {
            match snapshot {
                Some(old) => self.records[index] = old,
                None => {
                    self.records.pop();
                }
            }
            warn!("{}", e);
            return Err(e);
        }

        let record = &self.records[index];
        self.write_annotation(record)?;
        let outcome = SaveOutcome { id: record.id, created: snapshot.is_none() };
        self.rebuild_index()?;

        debug!(
            "{} 标注: {}",
            if outcome.created { "新建" } else { "更新" },
            frame_path.display()
        );
        metrics::inc_save(outcome.created);
        Ok(outcome)
    }

    /// 新建记录，会检查所有必填字段
    ///
    /// `values` 中需要包含 `frame_path`
    pub fn add_entry(&mut self, mut values: BTreeMap<String, FieldValue>) -> Result<SaveOutcome> {
        for field in self.schema.fields() {
            if !values.contains_key(&field.name) && field.required {
                return Err(StoreError::MissingRequiredField(field.name.clone()));
            }
        }
        let frame_path = match values.remove(FRAME_PATH) {
            Some(FieldValue::Text(path)) if !path.trim().is_empty() => PathBuf::from(path),
            Some(other) if !matches!(other, FieldValue::Text(_)) => {
                return Err(StoreError::TypeMismatch {
                    field: FRAME_PATH.to_string(),
                    expected: FieldType::Text,
                    found: other.field_type(),
                });
            }
            _ => return Err(StoreError::MissingRequiredField(FRAME_PATH.to_string())),
        };
        self.upsert(frame_path, values)
    }

    /// 删除记录及其标注文件
    pub fn delete(&mut self, id: Uuid) -> Result<Record> {
        let position = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::RecordNotFound(id.to_string()))?;
        let record = self.records.remove(position);

        if let Some(path) = self.layout.annotation_path(&record.frame_path) {
            match fs::remove_file(&path) {
                Ok(()) => debug!("删除标注文件: {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("标注文件不存在: {}", path.display())
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.rebuild_index()?;
        metrics::inc_delete();
        Ok(record)
    }

    /// 按图片路径删除记录
    pub fn delete_by_path(&mut self, frame_path: impl AsRef<Path>) -> Result<Option<Record>> {
        match self.find(frame_path).map(|r| r.id) {
            Some(id) => self.delete(id).map(Some),
            None => Ok(None),
        }
    }

    /// 返回用于表单展示的字段值，列表会转换为逗号分隔的文本
    pub fn load_for(&self, frame_path: impl AsRef<Path>) -> BTreeMap<String, FieldValue> {
        let Some(record) = self.find(frame_path) else {
            return BTreeMap::new();
        };
        record
            .values
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    FieldValue::List(_) => FieldValue::Text(value.display()),
                    _ => value.clone(),
                };
                (name.clone(), value)
            })
            .collect()
    }

    /// 清空内存并根据 index.json 重新加载所有记录
    pub fn reload_from_disk(&mut self) -> Result<ReloadReport> {
        self.reload_from_disk_with(|_, _| {})
    }

    /// 同 `reload_from_disk`，每处理完一个索引项调用一次 `on_entry(已处理, 总数)`
    pub fn reload_from_disk_with<F>(&mut self, mut on_entry: F) -> Result<ReloadReport>
    where
        F: FnMut(usize, usize),
    {
        let mut report = ReloadReport::default();

        let index_file = self.layout.index_file();
        if !index_file.exists() {
            self.records.clear();
            metrics::set_record_count(0);
            return Ok(report);
        }
        // 索引损坏时保留内存中的记录
        let entries = read_index(&index_file)?;
        let total = entries.len();
        self.records.clear();

        for (i, entry) in entries.iter().enumerate() {
            match self.load_entry(entry, &mut report.inferred_fields) {
                Ok(record) => {
                    match self.records.iter_mut().find(|r| r.frame_path == record.frame_path) {
                        Some(existing) => {
                            warn!("索引中存在重复图片: {}", entry.image);
                            existing.values.extend(record.values);
                        }
                        None => {
                            self.records.push(record);
                            report.loaded += 1;
                        }
                    }
                }
                Err(issue) => {
                    warn!("跳过索引项 {}: {:?}", entry.image, issue);
                    metrics::inc_reload_issue(issue.kind());
                    report.issues.push(issue);
                }
            }
            on_entry(i + 1, total);
        }

        metrics::set_record_count(self.records.len());
        info!(
            "从 {} 加载了 {} 条标注，跳过 {} 项",
            index_file.display(),
            report.loaded,
            report.issues.len()
        );
        Ok(report)
    }

    fn load_entry(
        &mut self,
        entry: &IndexEntry,
        inferred: &mut Vec<String>,
    ) -> Result<Record, ReloadIssue> {
        let image_path = self.layout.resolve(&entry.image);
        let annotation_path = self.layout.resolve(&entry.annotation);
        if !image_path.exists() {
            return Err(ReloadIssue::not_found(&image_path));
        }

        let text = fs::read_to_string(&annotation_path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ReloadIssue::not_found(&annotation_path),
            _ => ReloadIssue::Unreadable {
                path: annotation_path.display().to_string(),
                message: e.to_string(),
            },
        })?;
        let data = serde_json::from_str::<Map<String, Value>>(&text).map_err(|e| ReloadIssue::Parse {
            path: annotation_path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut values = BTreeMap::new();
        for (name, value) in data {
            if name == FRAME_PATH || name == RECORD_ID {
                continue;
            }
            let value = FieldValue::from(value);
            if self.schema.infer_and_register(&name, &value) {
                info!("推断字段类型: {} ({})", name, value.field_type());
                inferred.push(name.clone());
            }
            let value = match self.schema.get(&name) {
                Some(field) => value.coerce(field.field_type).unwrap_or_else(|value| {
                    warn!("{} 中字段 `{}` 的类型与定义不一致，保留原值", entry.annotation, name);
                    value
                }),
                None => value,
            };
            values.insert(name, value);
        }

        let frame_path = self.restore_frame_path(&image_path);
        Ok(Record::new(frame_path, values))
    }

    /// 将导出的图片复制回原始图片目录，返回记录使用的 `frame_path`
    fn restore_frame_path(&self, image_path: &Path) -> PathBuf {
        let (Some(image_dir), Some(name)) = (&self.image_dir, image_path.file_name()) else {
            return image_path.to_path_buf();
        };
        let restored = image_dir.join(name);
        if restored.exists() {
            return restored;
        }
        let result = fs::create_dir_all(image_dir).and_then(|_| copy_preserving(image_path, &restored));
        match result {
            Ok(()) => restored,
            Err(e) => {
                warn!("无法复制 {} 到 {}: {}", image_path.display(), image_dir.display(), e);
                image_path.to_path_buf()
            }
        }
    }

    /// 清空所有记录和标注文件
    ///
    /// 返回删除的标注文件数量
    pub fn clear_all(&mut self) -> Result<usize> {
        self.records.clear();
        let mut removed = 0;
        let annotations_dir = self.layout.annotations_dir();
        if annotations_dir.exists() {
            for entry in fs::read_dir(&annotations_dir)? {
                let path = entry?.path();
                let is_annotation = path.extension().is_some_and(|ext| ext == "json")
                    && path.file_name().is_some_and(|name| name != INDEX_FILE);
                if is_annotation && path.is_file() {
                    fs::remove_file(&path)?;
                    removed += 1;
                }
            }
        }
        write_index(self.layout.index_file(), &[])?;
        metrics::set_record_count(0);
        info!("清空数据集，删除 {} 个标注文件", removed);
        Ok(removed)
    }

    /// 重建并写入索引
    pub fn rebuild_index(&self) -> Result<Vec<IndexEntry>> {
        let entries = build_index(&self.records);
        write_index(self.layout.index_file(), &entries)?;
        metrics::set_record_count(self.records.len());
        Ok(entries)
    }

    /// 统计导出目录中的图片、标注文件和索引项数量
    pub fn summary(&self) -> Result<DatasetSummary> {
        let count = |dir: PathBuf, json_only: bool| -> Result<usize> {
            if !dir.exists() {
                return Ok(0);
            }
            let mut n = 0;
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.is_file() && (!json_only || path.extension().is_some_and(|e| e == "json")) {
                    n += 1;
                }
            }
            Ok(n)
        };
        let index_file = self.layout.index_file();
        Ok(DatasetSummary {
            images: count(self.layout.images_dir(), false)?,
            annotations: count(self.layout.annotations_dir(), true)?,
            index_entries: match index_file.exists() {
                true => read_index(&index_file)?.len(),
                false => 0,
            },
        })
    }

    /// 标注文件内容：按字段定义顺序排列，不包含 `id` 和 `frame_path`
    pub fn annotation_json(&self, record: &Record) -> Value {
        let map = self
            .schema
            .annotation_fields()
            .filter_map(|f| record.values.get(&f.name).map(|v| (f.name.clone(), v.to_json())))
            .collect::<Map<_, _>>();
        Value::Object(map)
    }

    /// 写入标注文件，返回是否写入
    fn write_annotation(&self, record: &Record) -> Result<bool> {
        let Some(path) = self.layout.annotation_path(&record.frame_path) else {
            return Ok(false);
        };
        let mut writer = BufWriter::new(fs::File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, &self.annotation_json(record))?;
        writer.flush()?;
        Ok(true)
    }

    /// 图片不在导出目录中时复制过去，不覆盖已存在的同名文件
    fn copy_image(&self, frame_path: &Path) -> Result<()> {
        if self.layout.contains_image(frame_path) {
            return Ok(());
        }
        let Some(destination) = self.layout.image_path(frame_path) else {
            return Err(StoreError::InvalidFramePath(frame_path.to_path_buf()));
        };
        if destination.exists() {
            return Ok(());
        }
        copy_preserving(frame_path, &destination)
            .map_err(|source| StoreError::ImageCopy { path: frame_path.to_path_buf(), source })?;
        debug!("复制图片: {} -> {}", frame_path.display(), destination.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(root: &Path) -> AnnotationStore {
        let mut schema = Schema::new();
        schema.define("count", FieldType::Integer, false).unwrap();
        let layout = ExportLayout::new(root);
        layout.ensure().unwrap();
        AnnotationStore::new(layout, schema)
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path());
        let image = dir.path().join("a.jpg");
        fs::write(&image, b"").unwrap();

        let err = store.upsert(&image, [("color".to_string(), FieldValue::from("red"))]).unwrap_err();
        assert!(matches!(err, StoreError::UnknownField(name) if name == "color"));
        let err = store.upsert(&image, [(FRAME_PATH.to_string(), FieldValue::from("x"))]).unwrap_err();
        assert!(matches!(err, StoreError::UnknownField(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path());
        let image = dir.path().join("a.jpg");
        fs::write(&image, b"").unwrap();

        let err = store.upsert(&image, [("count".to_string(), FieldValue::from("three"))]).unwrap_err();
        assert!(matches!(
            err,
            StoreError::TypeMismatch { expected: FieldType::Integer, found: FieldType::Text, .. }
        ));
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path());
        store.define_field("score", FieldType::Float, false).unwrap();
        let image = dir.path().join("a.jpg");
        fs::write(&image, b"").unwrap();

        for n in [f64::INFINITY, f64::NAN] {
            let err = store.upsert(&image, [("score".to_string(), FieldValue::Float(n))]).unwrap_err();
            assert!(matches!(err, StoreError::InvalidValue { expected: FieldType::Float, .. }));
        }
        assert!(store.is_empty());
        assert!(!store.layout().annotations_dir().join("a.json").exists());
    }

    #[test]
    fn test_copy_failure_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path());
        let missing = dir.path().join("missing.jpg");

        let err = store.upsert(&missing, [("count".to_string(), FieldValue::Integer(1))]).unwrap_err();
        assert!(matches!(err, StoreError::ImageCopy { .. }));
        assert!(store.is_empty());
        assert!(!store.layout().annotations_dir().join("missing.json").exists());
    }

    #[test]
    fn test_copy_failure_restores_previous_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path());
        let image = dir.path().join("a.jpg");
        fs::write(&image, b"").unwrap();
        store.upsert(&image, [("count".to_string(), FieldValue::Integer(1))]).unwrap();

        // 删除导出的副本和原图，下一次保存会复制失败
        fs::remove_file(store.layout().images_dir().join("a.jpg")).unwrap();
        fs::remove_file(&image).unwrap();
        assert!(store.upsert(&image, [("count".to_string(), FieldValue::Integer(2))]).is_err());
        assert_eq!(store.find(&image).unwrap().values["count"], FieldValue::Integer(1));
    }

    #[test]
    fn test_summary_counts_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path());
        assert_eq!(store.summary().unwrap(), DatasetSummary::default());

        let image = dir.path().join("a.jpg");
        fs::write(&image, b"").unwrap();
        store.upsert(&image, [("count".to_string(), FieldValue::Integer(1))]).unwrap();
        let summary = store.summary().unwrap();
        assert_eq!(summary, DatasetSummary { images: 1, annotations: 1, index_entries: 1 });
    }

    #[test]
    fn test_invalid_frame_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(dir.path());
        let err = store.upsert("", Vec::<(String, FieldValue)>::new()).unwrap_err();
        assert!(matches!(err, StoreError::InvalidFramePath(_)));
    }
}
