use std::path::PathBuf;

use thiserror::Error;

/// 特征提取错误
#[derive(Debug, Error)]
pub enum ExtractError {
    /// 图片面积为零，无法提取任何特征
    #[error("图片尺寸无效: {width}x{height}")]
    ZeroArea { width: u32, height: u32 },
    /// 批量提取时第 `index` 张图片失败
    #[error("提取第 {index} 张图像特征失败: {source}")]
    AtIndex {
        index: usize,
        #[source]
        source: Box<ExtractError>,
    },
}

/// 图片读取或解码错误
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("无法打开图像文件 {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("无法解码图像: {0}")]
    Codec(#[from] image::ImageError),
    #[error("不支持的图像格式: {0}")]
    Unsupported(String),
}

/// 标准化副本写入错误
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("写入文件失败 {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("编码图像失败: {0}")]
    Encode(#[from] image::ImageError),
}

/// 向量库调用错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("图片ID数量与向量数量不匹配: {ids} != {vectors}")]
    LengthMismatch { ids: usize, vectors: usize },
    #[error("向量维度不匹配: 期望 {expected}，实际 {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("无效的 k: {0}")]
    InvalidK(usize),
    /// 元数据表中的值无法解析
    #[error("向量库元数据 {key} 无效: {value:?}")]
    InvalidMeta { key: &'static str, value: String },
    #[error("向量库后端错误: {0}")]
    Backend(#[from] sqlx::Error),
}

/// 目录遍历错误，会导致整个扫描中止
#[derive(Debug, Error)]
#[error("遍历目录 {} 失败: {source}", .path.display())]
pub struct TraversalError {
    pub path: PathBuf,
    #[source]
    pub source: walkdir::Error,
}

/// 批量入库错误，单张图片和单个批次的失败不会出现在这里
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Traversal(#[from] TraversalError),
    /// 分发或收集任务 panic，统计结果不可信
    #[error("{task}任务异常退出: {source}")]
    Task {
        task: &'static str,
        #[source]
        source: tokio::task::JoinError,
    },
}

/// 单张图片处理过程中可能出现的错误
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// 后台线程 panic 或被取消
    #[error("后台任务异常退出: {0}")]
    Task(#[from] tokio::task::JoinError),
}
