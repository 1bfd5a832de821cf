use std::sync::Arc;

use crate::IMDB;
use crate::cli::server::ServerCommand;

/// 应用状态
pub struct AppState {
    /// 图片数据库
    pub db: IMDB,
    /// 未指定 top_k 时返回的结果数量
    pub top_k: usize,
    /// 上传大小限制，单位为字节
    pub max_file_size: usize,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(db: IMDB, opts: &ServerCommand) -> Arc<Self> {
        Arc::new(AppState {
            db,
            top_k: opts.search.top_k as usize,
            max_file_size: opts.max_file_size,
        })
    }
}
