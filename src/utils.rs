use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use image::DynamicImage;
use indicatif::ProgressStyle;

use crate::discovery::is_supported;
use crate::error::DecodeError;

/// 从文件路径加载图像
pub fn imread(path: impl AsRef<Path>) -> Result<DynamicImage, DecodeError> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|source| DecodeError::Io { path: path.to_path_buf(), source })?;
    imdecode(&data)
}

/// 从内存中解码图像
pub fn imdecode(data: &[u8]) -> Result<DynamicImage, DecodeError> {
    Ok(image::load_from_memory(data)?)
}

/// 检查上传文件名是否为支持的图像格式
pub fn check_format(filename: &str) -> Result<(), DecodeError> {
    if is_supported(filename) {
        Ok(())
    } else {
        Err(DecodeError::Unsupported(filename.to_string()))
    }
}

/// 当前 Unix 时间戳（秒）
pub fn unix_timestamp() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or_default()
}

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {per_sec} {msg}")
        .expect("failed to build progress style")
}
