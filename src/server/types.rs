use std::path::Path;

use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::imdb::{DbStats, SearchMatch};

/// 上传或搜索请求
#[derive(TryFromMultipart)]
pub struct ImageRequest {
    pub image: FieldData<Bytes>,
}

/// 图片表单（用于API文档）
#[derive(Debug, ToSchema)]
#[allow(unused)]
pub struct ImageForm {
    /// 图片文件，支持 jpg、jpeg、png、bmp、tiff
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub image: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// 返回的结果数量，1-100
    pub top_k: Option<u32>,
}

/// 通用响应
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

/// 上传响应
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub image_id: String,
    /// 标准化副本的文件名，可通过 `/uploads/{image_path}` 访问
    pub image_path: String,
}

/// 单条搜索结果
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResult {
    pub image_id: String,
    /// 平方欧氏距离，越小越相似
    pub distance: f32,
    /// 相似度百分比
    pub similarity: String,
    /// 标准化副本的文件名，副本不存在时为空
    pub image_path: Option<String>,
}

impl From<SearchMatch> for SearchResult {
    fn from(m: SearchMatch) -> Self {
        Self {
            image_id: m.id,
            distance: m.distance,
            similarity: m.similarity,
            image_path: m.stored_path.as_deref().and_then(file_name),
        }
    }
}

/// 搜索响应
#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<SearchResult>,
    pub total: usize,
}

/// 统计信息响应
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub success: bool,
    pub message: String,
    /// 向量库后端
    pub backend: String,
    /// 向量数量
    pub count: u64,
    /// 向量库维度
    pub dimension: usize,
    /// 距离度量
    pub metric: String,
    /// 特征提取器输出维度
    pub feature_dimension: usize,
    /// 标准化副本存储目录
    pub upload_path: String,
    /// 上传大小限制，单位为字节
    pub max_file_size: usize,
    pub version: String,
    pub timestamp: i64,
}

impl StatsResponse {
    pub fn new(stats: DbStats, max_file_size: usize, timestamp: i64) -> Self {
        Self {
            success: true,
            message: "统计信息获取成功".to_string(),
            backend: stats.store.backend.to_string(),
            count: stats.store.count,
            dimension: stats.store.dimension,
            metric: stats.store.metric.to_string(),
            feature_dimension: stats.feature_dimension,
            upload_path: stats.storage_root.display().to_string(),
            max_file_size,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp,
        }
    }
}

pub fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}
