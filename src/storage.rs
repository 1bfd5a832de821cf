use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat};
use log::debug;

use crate::error::StorageError;

/// JPEG 副本的编码质量
const JPEG_QUALITY: u8 = 90;

/// 查找副本时尝试的后缀名
const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// 标准化图片副本存储
///
/// 每张入库的图片都会被重新编码后保存为 `<root>/<id>.<ext>`，以统一格式
#[derive(Debug, Clone)]
pub struct CanonicalStorage {
    root: PathBuf,
}

impl CanonicalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 保存图片副本，返回副本路径
    ///
    /// jpg/jpeg 来源保持原后缀，其余格式统一编码为 png
    pub fn save(&self, image: &DynamicImage, id: &str, source_ext: &str) -> Result<PathBuf, StorageError> {
        let ext = canonical_extension(source_ext);
        let path = self.root.join(format!("{}.{}", id, ext));

        fs::create_dir_all(&self.root)
            .map_err(|source| StorageError::Io { path: self.root.clone(), source })?;
        let file = File::create(&path).map_err(|source| StorageError::Io { path: path.clone(), source })?;
        let mut writer = BufWriter::new(file);

        match ext {
            "png" => image.write_to(&mut writer, ImageFormat::Png)?,
            _ => {
                // JPEG 不支持透明通道
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY))?;
            }
        }
        writer.flush().map_err(|source| StorageError::Io { path: path.clone(), source })?;

        debug!("保存图片副本: {}", path.display());
        Ok(path)
    }

    /// 查找图片副本的路径
    pub fn locate(&self, id: &str) -> Option<PathBuf> {
        KNOWN_EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{}.{}", id, ext)))
            .find(|path| path.is_file())
    }

    /// 删除图片副本，副本不存在时返回 false
    pub fn remove(&self, id: &str) -> Result<bool, StorageError> {
        match self.locate(id) {
            Some(path) => {
                fs::remove_file(&path).map_err(|source| StorageError::Io { path, source })?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn canonical_extension(source_ext: &str) -> &'static str {
    match source_ext.to_ascii_lowercase().as_str() {
        "jpg" => "jpg",
        "jpeg" => "jpeg",
        _ => "png",
    }
}
