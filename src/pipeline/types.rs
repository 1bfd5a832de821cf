use std::path::PathBuf;

use serde::Serialize;

/// 一个批次，由同一个工作任务按顺序处理
#[derive(Debug, Clone)]
pub struct Batch {
    /// 批次序号，从 0 开始
    pub index: usize,
    /// 用于日志关联的短 ID
    pub id: String,
    pub paths: Vec<PathBuf>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// 单个批次的处理结果
///
/// 对每个批次都满足 `processed_count + error_count == batch.len()`
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub batch_id: String,
    pub processed_count: usize,
    pub error_count: usize,
    /// 整个批次失败的原因，目前只有向量库插入失败
    pub fatal_error: Option<String>,
}

impl BatchResult {
    /// 整个批次失败
    pub fn failed(batch: &Batch, reason: impl ToString) -> Self {
        Self {
            batch_id: batch.id.clone(),
            processed_count: 0,
            error_count: batch.len(),
            fatal_error: Some(reason.to_string()),
        }
    }
}

/// 整次运行的汇总统计，只由收集任务写入
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateStats {
    pub total_processed: usize,
    pub total_errors: usize,
    pub batches_seen: usize,
    pub batches_failed: usize,
}

impl AggregateStats {
    pub fn record(&mut self, result: &BatchResult) {
        self.total_processed += result.processed_count;
        self.total_errors += result.error_count;
        self.batches_seen += 1;
        if result.fatal_error.is_some() {
            self.batches_failed += 1;
        }
    }
}

/// 批处理运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    Dispatching = 1,
    Draining = 2,
    Done = 3,
}

impl From<u8> for RunState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Dispatching,
            2 => Self::Draining,
            _ => Self::Done,
        }
    }
}

/// 按发现顺序把文件切分成连续的批次，最后一个批次可能不满
pub fn partition(files: Vec<PathBuf>, batch_size: usize) -> Vec<Batch> {
    files
        .chunks(batch_size.max(1))
        .enumerate()
        .map(|(index, paths)| Batch { index, id: short_id(), paths: paths.to_vec() })
        .collect()
}

fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("{:04}.jpg", i))).collect()
    }

    #[test]
    fn test_partition_sizes() {
        let batches = partition(files(230), 50);
        let sizes = batches.iter().map(Batch::len).collect::<Vec<_>>();
        assert_eq!(sizes, vec![50, 50, 50, 50, 30]);
        assert!(batches.iter().enumerate().all(|(i, b)| b.index == i && b.id.len() == 8));
    }

    #[test]
    fn test_partition_keeps_order() {
        let input = files(17);
        let batches = partition(input.clone(), 4);
        assert_eq!(batches.len(), 17usize.div_ceil(4));
        let flat = batches.into_iter().flat_map(|b| b.paths).collect::<Vec<_>>();
        assert_eq!(flat, input);
    }

    #[test]
    fn test_partition_empty() {
        assert!(partition(vec![], 10).is_empty());
    }

    #[test]
    fn test_aggregate() {
        let batch = Batch { index: 0, id: "abcd1234".into(), paths: files(3) };
        let mut stats = AggregateStats::default();
        stats.record(&BatchResult {
            batch_id: batch.id.clone(),
            processed_count: 2,
            error_count: 1,
            fatal_error: None,
        });
        stats.record(&BatchResult::failed(&batch, "boom"));
        assert_eq!(
            stats,
            AggregateStats { total_processed: 2, total_errors: 4, batches_seen: 2, batches_failed: 1 }
        );
    }
}
