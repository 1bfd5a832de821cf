use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::info;
use regex::Regex;
use walkdir::WalkDir;

use crate::error::TraversalError;

/// 支持解码的图像格式
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff"];

static RE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    let re = format!("(?i)^({})$", SUPPORTED_EXTENSIONS.join("|"));
    Regex::new(&re).expect("failed to build regex")
});

/// 检查文件是否为支持的图像格式（后缀名不区分大小写）
pub fn is_supported(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .map(|ext| RE_SUFFIX.is_match(&ext.to_string_lossy()))
        .unwrap_or(false)
}

/// 递归扫描目录，返回所有支持格式的图片路径
///
/// 同一目录下的条目按文件名排序，因此结果顺序是确定的。
/// 任何一个目录无法读取都会中止整个扫描，不会返回部分结果。
pub fn discover(root: impl AsRef<Path>) -> Result<Vec<PathBuf>, TraversalError> {
    let root = root.as_ref();
    info!("开始扫描目录: {}", root.display());

    let mut files = vec![];
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| TraversalError {
            path: source.path().unwrap_or(root).to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file() && is_supported(entry.path()) {
            files.push(entry.into_path());
        }
    }

    info!("扫描完成，共 {} 张图片", files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_is_supported() {
        assert!(is_supported("a/b.jpg"));
        assert!(is_supported("a/b.JPEG"));
        assert!(is_supported("b.Tiff"));
        assert!(!is_supported("b.gif"));
        assert!(!is_supported("b.jpg.txt"));
        assert!(!is_supported("jpg"));
        assert!(!is_supported("b.xjpg"));
    }

    #[test]
    fn test_discover_recursive_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        fs::create_dir_all(root.join("fake.png")).unwrap();
        for name in ["b.png", "a.JPG", "notes.txt", "sub/c.bmp", "sub/deeper/d.tiff"] {
            fs::write(root.join(name), b"x").unwrap();
        }

        let files = discover(root).unwrap();
        let names = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["a.JPG", "b.png", "sub/c.bmp", "sub/deeper/d.tiff"]);
    }

    #[test]
    fn test_discover_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(dir.path().join("missing")).unwrap_err();
        assert!(err.path.ends_with("missing"));
    }
}
