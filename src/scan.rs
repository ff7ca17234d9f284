use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use regex::Regex;
use walkdir::WalkDir;

/// 默认扫描的图片后缀
pub const IMAGE_SUFFIX: &str = "jpg,jpeg,png,bmp,gif";

/// 图片目录扫描器，只扫描目录第一层
#[derive(Debug, Clone)]
pub struct ImageScanner {
    re_suf: Regex,
}

impl Default for ImageScanner {
    fn default() -> Self {
        Self::new(IMAGE_SUFFIX).expect("failed to build regex")
    }
}

impl ImageScanner {
    /// # Arguments
    ///
    /// * `suffix` - 后缀名列表，多个后缀用逗号分隔，不区分大小写
    pub fn new(suffix: &str) -> Result<Self, regex::Error> {
        let re_suf = format!("(?i)^({})$", suffix.replace(',', "|"));
        Ok(Self { re_suf: Regex::new(&re_suf)? })
    }

    pub fn is_image(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| self.re_suf.is_match(&ext.to_string_lossy()))
    }

    /// 扫描目录，按文件名排序返回图片路径
    ///
    /// 目录不存在时会创建它并返回空列表
    pub fn scan(&self, dir: impl AsRef<Path>) -> io::Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.exists() {
            debug!("创建图片目录: {}", dir.display());
            fs::create_dir_all(dir)?;
            return Ok(vec![]);
        }

        let mut images = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && self.is_image(entry.path()))
            .map(|entry| entry.into_path())
            .collect::<Vec<_>>();
        images.sort();

        info!("扫描完成，共 {} 张图片", images.len());
        Ok(images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "c.txt", "d.Jpeg", "e.gif.bak"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("sub.jpg")).unwrap();
        fs::write(dir.path().join("sub.jpg").join("nested.jpg"), b"").unwrap();

        let images = ImageScanner::default().scan(dir.path()).unwrap();
        let names = images
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect::<Vec<_>>();
        assert_eq!(names, ["a.jpg", "b.PNG", "d.Jpeg"]);
    }

    #[test]
    fn test_scan_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("image_raw");
        assert!(ImageScanner::default().scan(&raw).unwrap().is_empty());
        assert!(raw.is_dir());
    }
}
