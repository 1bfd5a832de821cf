mod memory;
mod sqlite;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::future::Future;

use serde::Serialize;

pub use self::memory::MemoryStore;
pub use self::sqlite::SqliteStore;
use crate::error::StoreError;
use crate::features::FeatureVector;

/// 距离度量名称
pub const METRIC: &str = "L2";

/// 搜索结果，`distance` 为平方欧氏距离，越小越相似
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub distance: f32,
}

/// 向量库统计信息，仅用于展示
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    pub backend: &'static str,
    pub count: u64,
    pub dimension: usize,
    pub metric: &'static str,
}

/// 向量库接口
pub trait VectorStore: Send + Sync {
    /// 向量维度
    fn dimension(&self) -> usize;

    /// 批量插入，要么全部成功，要么全部失败
    fn insert(
        &self,
        ids: Vec<String>,
        vectors: Vec<FeatureVector>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 搜索最相似的 `k` 个向量，按距离升序返回
    fn search(
        &self,
        query: &FeatureVector,
        k: usize,
    ) -> impl Future<Output = Result<Vec<SearchHit>, StoreError>> + Send;

    /// 删除向量，返回是否真的删除了记录
    fn delete(&self, id: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn stats(&self) -> impl Future<Output = Result<StoreStats, StoreError>> + Send;
}

/// 检查插入参数
pub(crate) fn check_insert(
    dimension: usize,
    ids: &[String],
    vectors: &[FeatureVector],
) -> Result<(), StoreError> {
    if ids.len() != vectors.len() {
        return Err(StoreError::LengthMismatch { ids: ids.len(), vectors: vectors.len() });
    }
    for vector in vectors {
        check_dimension(dimension, vector)?;
    }
    Ok(())
}

pub(crate) fn check_dimension(dimension: usize, vector: &[f32]) -> Result<(), StoreError> {
    if vector.len() != dimension {
        return Err(StoreError::DimensionMismatch { expected: dimension, actual: vector.len() });
    }
    Ok(())
}

pub(crate) fn check_k(k: usize) -> Result<(), StoreError> {
    if k == 0 {
        return Err(StoreError::InvalidK(k));
    }
    Ok(())
}

/// 平方欧氏距离
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

struct Candidate(SearchHit);

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.distance.total_cmp(&other.0.distance).then_with(|| self.0.id.cmp(&other.0.id))
    }
}

/// 保留距离最小的 `k` 个结果
pub(crate) struct TopK {
    k: usize,
    heap: BinaryHeap<Candidate>,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self { k, heap: BinaryHeap::with_capacity(k + 1) }
    }

    pub fn push(&mut self, id: &str, distance: f32) {
        if self.heap.len() == self.k {
            match self.heap.peek() {
                Some(worst) if distance > worst.0.distance => return,
                _ => {}
            }
        }
        self.heap.push(Candidate(SearchHit { id: id.to_string(), distance }));
        if self.heap.len() > self.k {
            self.heap.pop();
        }
    }

    pub fn into_sorted_vec(self) -> Vec<SearchHit> {
        self.heap.into_sorted_vec().into_iter().map(|c| c.0).collect()
    }
}
