use std::path::{Path, PathBuf};

/// 图片浏览游标，前后切换时循环
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    images: Vec<PathBuf>,
    cursor: usize,
}

impl Navigator {
    pub fn new(images: Vec<PathBuf>, cursor: usize) -> Self {
        let cursor = if images.is_empty() { 0 } else { cursor.min(images.len() - 1) };
        Self { images, cursor }
    }

    /// 替换图片列表，游标回到第一张
    pub fn set_images(&mut self, images: Vec<PathBuf>) {
        self.images = images;
        self.cursor = 0;
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&Path> {
        self.images.get(self.cursor).map(PathBuf::as_path)
    }

    pub fn advance(&mut self) -> Option<&Path> {
        if !self.images.is_empty() {
            self.cursor = (self.cursor + 1) % self.images.len();
        }
        self.current()
    }

    pub fn retreat(&mut self) -> Option<&Path> {
        if !self.images.is_empty() {
            self.cursor = (self.cursor + self.images.len() - 1) % self.images.len();
        }
        self.current()
    }

    /// 跳转到指定图片，找不到时游标不变
    pub fn seek(&mut self, path: &Path) -> bool {
        match self.images.iter().position(|p| p == path) {
            Some(i) => {
                self.cursor = i;
                true
            }
            None => false,
        }
    }

    /// 按完整路径或文件名查找图片
    pub fn find(&self, name: &Path) -> Option<&Path> {
        self.images
            .iter()
            .find(|p| p.as_path() == name)
            .or_else(|| {
                let file_name = name.file_name()?;
                self.images.iter().find(|p| p.file_name() == Some(file_name))
            })
            .map(PathBuf::as_path)
    }
}
