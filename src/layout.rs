use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const IMAGES_DIR: &str = "images";
pub const ANNOTATIONS_DIR: &str = "annotations";
pub const INDEX_FILE: &str = "index.json";

/// 导出目录结构
///
/// ```text
/// <root>/
///   images/<原始文件名>
///   annotations/<不含扩展名的文件名>.json
///   index.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLayout {
    root: PathBuf,
}

impl ExportLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    pub fn annotations_dir(&self) -> PathBuf {
        self.root.join(ANNOTATIONS_DIR)
    }

    pub fn index_file(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    /// 创建 images 和 annotations 目录
    pub fn ensure(&self) -> io::Result<()> {
        fs::create_dir_all(self.images_dir())?;
        fs::create_dir_all(self.annotations_dir())
    }

    /// 图片在导出目录中的路径，无法取得文件名时返回 None
    pub fn image_path(&self, frame_path: &Path) -> Option<PathBuf> {
        frame_path.file_name().map(|name| self.images_dir().join(name))
    }

    /// 图片对应的标注文件路径
    pub fn annotation_path(&self, frame_path: &Path) -> Option<PathBuf> {
        annotation_file_name(frame_path).map(|name| self.annotations_dir().join(name))
    }

    /// 解析索引中的相对路径
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// 判断图片是否已经位于导出的 images 目录中
    pub fn contains_image(&self, frame_path: &Path) -> bool {
        let Some(parent) = frame_path.parent() else {
            return false;
        };
        match (parent.canonicalize(), self.images_dir().canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// `a.jpg` => `a.json`
pub fn annotation_file_name(frame_path: &Path) -> Option<String> {
    frame_path.file_name()?;
    let stem = frame_path.file_stem()?;
    Some(format!("{}.json", stem.to_string_lossy()))
}
