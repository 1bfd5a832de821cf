use std::collections::HashMap;
use std::sync::RwLock;

use super::*;

/// 进程内向量库，精确搜索
pub struct MemoryStore {
    dimension: usize,
    vectors: RwLock<HashMap<String, FeatureVector>>,
}

impl MemoryStore {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, vectors: RwLock::new(HashMap::new()) }
    }

    pub fn len(&self) -> usize {
        self.vectors.read().expect("failed to acquire rw lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.vectors.read().expect("failed to acquire rw lock").contains_key(id)
    }
}

impl VectorStore for MemoryStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn insert(&self, ids: Vec<String>, vectors: Vec<FeatureVector>) -> Result<(), StoreError> {
        check_insert(self.dimension, &ids, &vectors)?;
        let mut lock = self.vectors.write().expect("failed to acquire rw lock");
        lock.extend(ids.into_iter().zip(vectors));
        Ok(())
    }

    async fn search(&self, query: &FeatureVector, k: usize) -> Result<Vec<SearchHit>, StoreError> {
        check_k(k)?;
        check_dimension(self.dimension, query)?;
        let lock = self.vectors.read().expect("failed to acquire rw lock");
        let mut topk = TopK::new(k);
        for (id, vector) in lock.iter() {
            topk.push(id, l2_distance(query, vector));
        }
        Ok(topk.into_sorted_vec())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.vectors.write().expect("failed to acquire rw lock").remove(id).is_some())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats {
            backend: "memory",
            count: self.len() as u64,
            dimension: self.dimension,
            metric: METRIC,
        })
    }
}
