use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use filetime::FileTime;
use indicatif::ProgressStyle;

/// 复制文件，并保留权限和访问/修改时间
pub fn copy_preserving(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> io::Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    fs::copy(src, dst)?;
    let meta = fs::metadata(src)?;
    filetime::set_file_times(
        dst,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )
}

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .expect("invalid progress template")
        .progress_chars("#>-")
}

pub fn read_line(prompt: &str) -> anyhow::Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let v = std::io::stdin()
        .bytes()
        .take_while(|c| c.as_ref().ok() != Some(&b'\n'))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(String::from_utf8(v)?.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_preserving_keeps_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        let dst = dir.path().join("b.jpg");
        fs::write(&src, b"jpeg").unwrap();
        let mtime = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&src, mtime).unwrap();

        copy_preserving(&src, &dst).unwrap();

        let meta = fs::metadata(&dst).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), mtime);
        assert_eq!(fs::read(&dst).unwrap(), b"jpeg");
    }
}
