use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::ExportLayout;
use crate::navigator::Navigator;
use crate::scan::ImageScanner;
use crate::schema::Schema;
use crate::store::{AnnotationStore, ReloadReport, SaveOutcome};
use crate::value::FieldValue;

/// 需要在多次运行之间保存的会话状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub schema: Schema,
    /// 原始图片目录
    pub image_dir: PathBuf,
    /// 导出目录
    pub export_dir: PathBuf,
    /// 当前浏览的图片位置
    pub cursor: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            schema: Schema::default(),
            image_dir: PathBuf::from("image_raw"),
            export_dir: PathBuf::from("vlm_dataset_export"),
            cursor: 0,
        }
    }
}

impl SessionState {
    /// 读取状态文件，不存在时返回默认值
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("状态文件不存在，使用默认配置: {}", path.display());
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// 一次标注会话：字段定义、标注存储和图片浏览位置
///
/// 所有操作都通过显式持有的 `Session` 完成，不依赖全局状态
#[derive(Debug)]
pub struct Session {
    store: AnnotationStore,
    navigator: Navigator,
    scanner: ImageScanner,
    image_dir: PathBuf,
    state_file: Option<PathBuf>,
}

impl Session {
    /// 从状态文件打开会话
    ///
    /// # Arguments
    ///
    /// * `state_file` - 状态文件路径
    /// * `export_dir` - 覆盖状态文件中的导出目录
    /// * `image_dir` - 覆盖状态文件中的原始图片目录
    pub fn open(
        state_file: impl Into<PathBuf>,
        export_dir: Option<PathBuf>,
        image_dir: Option<PathBuf>,
    ) -> Result<(Self, Option<ReloadReport>)> {
        let state_file = state_file.into();
        let mut state = SessionState::load(&state_file)?;
        if let Some(dir) = export_dir {
            state.export_dir = dir;
        }
        if let Some(dir) = image_dir {
            state.image_dir = dir;
        }
        let (mut session, report) = Self::from_state(state)?;
        session.state_file = Some(state_file);
        Ok((session, report))
    }

    /// 根据会话状态创建会话，不关联状态文件
    pub fn from_state(state: SessionState) -> Result<(Self, Option<ReloadReport>)> {
        let layout = ExportLayout::new(&state.export_dir);
        let (store, report) =
            AnnotationStore::open(layout, state.schema, Some(state.image_dir.clone()))?;
        if let Some(report) = &report {
            info!("从上次会话加载了 {} 条标注", report.loaded);
        }

        let scanner = ImageScanner::default();
        let images = scanner.scan(&state.image_dir)?;
        let session = Self {
            store,
            navigator: Navigator::new(images, state.cursor),
            scanner,
            image_dir: state.image_dir,
            state_file: None,
        };
        Ok((session, report))
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            schema: self.store.schema().clone(),
            image_dir: self.image_dir.clone(),
            export_dir: self.store.layout().root().to_path_buf(),
            cursor: self.navigator.cursor(),
        }
    }

    /// 将会话状态写回状态文件
    pub fn persist(&self) -> Result<()> {
        if let Some(path) = &self.state_file {
            self.state().save(path)?;
            debug!("保存会话状态: {}", path.display());
        }
        Ok(())
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut AnnotationStore {
        &mut self.store
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn scanner(&self) -> &ImageScanner {
        &self.scanner
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    /// 切换原始图片目录并重新扫描，游标回到第一张
    pub fn load_images(&mut self, image_dir: Option<PathBuf>) -> Result<usize> {
        if let Some(dir) = image_dir {
            self.image_dir = dir;
        }
        let images = self.scanner.scan(&self.image_dir)?;
        self.navigator.set_images(images);
        Ok(self.navigator.len())
    }

    /// 将用户给出的图片名或路径解析为记录使用的 `frame_path`
    ///
    /// 优先匹配图片列表和已有记录，都找不到时原样返回
    pub fn resolve_image(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        if let Some(path) = self.navigator.find(name) {
            return path.to_path_buf();
        }
        let records = self.store.records();
        records
            .iter()
            .find(|r| r.frame_path == name)
            .or_else(|| records.iter().find(|r| r.frame_path.file_name() == name.file_name()))
            .map(|r| r.frame_path.clone())
            .unwrap_or_else(|| name.to_path_buf())
    }

    pub fn current_image(&self) -> Option<&Path> {
        self.navigator.current()
    }

    /// 当前图片已保存的值
    pub fn current_values(&self) -> BTreeMap<String, FieldValue> {
        match self.navigator.current() {
            Some(path) => self.store.load_for(path),
            None => BTreeMap::new(),
        }
    }

    /// 保存当前图片的标注，没有填写任何值时不创建记录
    pub fn save_current(
        &mut self,
        values: BTreeMap<String, FieldValue>,
    ) -> Result<Option<SaveOutcome>> {
        let Some(path) = self.navigator.current().map(Path::to_path_buf) else {
            return Ok(None);
        };
        if values.is_empty() {
            return Ok(None);
        }
        self.store.upsert(path, values).map(Some)
    }

    /// 先保存当前图片，再切换到下一张
    pub fn next(&mut self, pending: BTreeMap<String, FieldValue>) -> Result<Option<PathBuf>> {
        self.save_current(pending)?;
        Ok(self.navigator.advance().map(Path::to_path_buf))
    }

    /// 先保存当前图片，再切换到上一张
    pub fn previous(&mut self, pending: BTreeMap<String, FieldValue>) -> Result<Option<PathBuf>> {
        self.save_current(pending)?;
        Ok(self.navigator.retreat().map(Path::to_path_buf))
    }

    /// 跳转到指定图片
    pub fn seek(&mut self, path: &Path) -> bool {
        self.navigator.seek(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn state(root: &Path) -> SessionState {
        let mut schema = Schema::new();
        schema.define("caption", FieldType::Text, false).unwrap();
        SessionState {
            schema,
            image_dir: root.join("raw"),
            export_dir: root.join("export"),
            cursor: 0,
        }
    }

    #[test]
    fn test_navigation_saves_pending_values() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        fs::create_dir_all(&state.image_dir).unwrap();
        fs::write(state.image_dir.join("a.jpg"), b"a").unwrap();
        fs::write(state.image_dir.join("b.jpg"), b"b").unwrap();

        let (mut session, report) = Session::from_state(state).unwrap();
        assert!(report.is_none());
        assert_eq!(session.navigator().len(), 2);

        // 没有填写值时不创建记录
        let next = session.next(BTreeMap::new()).unwrap().unwrap();
        assert!(next.ends_with("b.jpg"));
        assert!(session.store().is_empty());

        let values = BTreeMap::from([("caption".to_string(), FieldValue::from("a bird"))]);
        let next = session.next(values).unwrap().unwrap();
        assert!(next.ends_with("a.jpg"));
        assert_eq!(session.store().len(), 1);
        assert!(session.current_values().is_empty());

        session.previous(BTreeMap::new()).unwrap();
        assert_eq!(session.current_values()["caption"], FieldValue::from("a bird"));
    }

    #[test]
    fn test_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("conf").join("session.json");
        let mut state = state(dir.path());
        state.cursor = 3;
        state.save(&state_file).unwrap();
        assert_eq!(SessionState::load(&state_file).unwrap(), state);

        let (session, _) = Session::open(&state_file, None, None).unwrap();
        // 图片目录为空，游标被重置
        assert_eq!(session.state().cursor, 0);
        assert!(session.store().schema().contains("caption"));
    }

    #[test]
    fn test_missing_state_uses_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = SessionState::load(dir.path().join("none.json")).unwrap();
        assert_eq!(state, SessionState::default());
    }
}
