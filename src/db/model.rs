use std::path::PathBuf;

use serde::Serialize;

use crate::features::FeatureVector;

/// 已入库的图片记录，创建后不再修改，只能按 ID 删除
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    /// 图片 ID
    pub id: String,
    /// 特征向量
    #[serde(skip)]
    pub vector: FeatureVector,
    /// 标准化副本路径
    pub stored_path: PathBuf,
    /// 入库时间，Unix 时间戳
    pub inserted_at: i64,
}

/// 向量表中的一行
#[derive(Debug, sqlx::FromRow)]
pub struct VectorRecord {
    /// 分页游标
    pub row_id: i64,
    /// 图片 ID
    pub id: String,
    /// 按本机字节序存储的 f32 数组
    pub vector: Vec<u8>,
}
