use std::path::Path;

use log::{debug, info};

use super::*;
use crate::db::{self, Database, crud};
use crate::utils::unix_timestamp;

/// 每次从数据库读取的向量数量
const SCAN_PAGE: usize = 4096;

const META_DIMENSION: &str = "dimension";

/// 基于 SQLite 的持久化向量库，精确搜索
pub struct SqliteStore {
    pool: Database,
    dimension: usize,
}

impl SqliteStore {
    /// 打开或创建向量库
    ///
    /// 向量库首次创建时记录维度，之后以不同维度打开会失败
    pub async fn open(path: impl AsRef<Path>, dimension: usize) -> Result<Self, StoreError> {
        let pool = db::init_db(path).await?;

        match crud::get_meta(&pool, META_DIMENSION).await? {
            Some(stored) => {
                let stored = stored
                    .parse::<usize>()
                    .map_err(|_| StoreError::InvalidMeta { key: META_DIMENSION, value: stored.clone() })?;
                if stored != dimension {
                    return Err(StoreError::DimensionMismatch { expected: stored, actual: dimension });
                }
            }
            None => {
                info!("初始化向量库，维度: {}", dimension);
                crud::set_meta(&pool, META_DIMENSION, &dimension.to_string()).await?;
            }
        }

        Ok(Self { pool, dimension })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl VectorStore for SqliteStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn insert(&self, ids: Vec<String>, vectors: Vec<FeatureVector>) -> Result<(), StoreError> {
        check_insert(self.dimension, &ids, &vectors)?;

        let now = unix_timestamp();
        let mut tx = self.pool.begin().await?;
        for (id, vector) in ids.iter().zip(&vectors) {
            let blob = bytemuck::cast_slice::<f32, u8>(&vector[..]);
            crud::add_vector(&mut *tx, id, blob, now).await?;
        }
        tx.commit().await?;

        debug!("成功插入 {} 个向量", ids.len());
        Ok(())
    }

    async fn search(&self, query: &FeatureVector, k: usize) -> Result<Vec<SearchHit>, StoreError> {
        check_k(k)?;
        check_dimension(self.dimension, query)?;

        let mut topk = TopK::new(k);
        let mut after = 0;
        loop {
            let rows = crud::get_vectors(&self.pool, after, SCAN_PAGE).await?;
            for row in &rows {
                let vector = bytemuck::pod_collect_to_vec::<u8, f32>(&row.vector);
                topk.push(&row.id, l2_distance(query, &vector));
            }
            match rows.last() {
                Some(last) if rows.len() == SCAN_PAGE => after = last.row_id,
                _ => break,
            }
        }

        Ok(topk.into_sorted_vec())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = crud::delete_vector(&self.pool, id).await?;
        debug!("删除图片 {} 的向量: {} 行", id, removed);
        Ok(removed > 0)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats {
            backend: "sqlite",
            count: crud::count_vectors(&self.pool).await?,
            dimension: self.dimension,
            metric: METRIC,
        })
    }
}
