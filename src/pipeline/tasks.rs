use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{Receiver, Sender, channel};
use tokio::task::{JoinHandle, spawn_blocking};

use super::types::*;
use crate::error::IngestError;
use crate::features::{FeatureExtractor, FeatureVector};
use crate::metrics;
use crate::storage::CanonicalStorage;
use crate::store::VectorStore;
use crate::utils::imread;

/// 工作任务共享的组件
pub struct Components<S> {
    pub extractor: Arc<dyn FeatureExtractor>,
    pub store: Arc<S>,
    pub storage: Arc<CanonicalStorage>,
}

impl<S> Clone for Components<S> {
    fn clone(&self) -> Self {
        Self {
            extractor: self.extractor.clone(),
            store: self.store.clone(),
            storage: self.storage.clone(),
        }
    }
}

/// 按顺序发送所有批次，发送完毕后关闭任务队列
pub fn task_dispatch(batches: Vec<Batch>, capacity: usize) -> (JoinHandle<()>, Receiver<Batch>) {
    let (tx, rx) = channel(capacity);
    let t = tokio::spawn(async move {
        for batch in batches {
            // 所有工作任务都已退出
            if tx.send(batch).await.is_err() {
                break;
            }
        }
    });
    (t, rx)
}

/// 启动 `workers` 个工作任务，共同从任务队列中领取批次
pub fn task_workers<S>(
    rx: Receiver<Batch>,
    workers: usize,
    tx: Sender<BatchResult>,
    components: Components<S>,
) -> Vec<JoinHandle<()>>
where
    S: VectorStore + 'static,
{
    let rx = Arc::new(Mutex::new(rx));
    (0..workers)
        .map(|worker| {
            let rx = rx.clone();
            let tx = tx.clone();
            let components = components.clone();
            tokio::spawn(async move {
                loop {
                    // NOTE: 锁只在领取批次时持有，处理批次时其他任务可以继续领取
                    let batch = rx.lock().await.recv().await;
                    let Some(batch) = batch else {
                        break;
                    };
                    let result = process_batch(&components, batch).await;
                    if tx.send(result).await.is_err() {
                        break;
                    }
                }
                debug!("工作任务 {} 退出", worker);
            })
        })
        .collect()
}

/// 汇总所有批次结果，结果队列关闭后返回最终统计
pub fn task_collect(
    mut rx: Receiver<BatchResult>,
    report_every: usize,
    pb: ProgressBar,
) -> JoinHandle<AggregateStats> {
    tokio::spawn(async move {
        let mut stats = AggregateStats::default();
        while let Some(result) = rx.recv().await {
            stats.record(&result);
            pb.inc((result.processed_count + result.error_count) as u64);
            if let Some(reason) = &result.fatal_error {
                pb.set_message(format!("批次 {} 失败: {}", result.batch_id, reason));
            }
            if stats.batches_seen % report_every.max(1) == 0 {
                info!(
                    "已处理 {} 个批次，成功 {} 张，失败 {} 张",
                    stats.batches_seen, stats.total_processed, stats.total_errors
                );
            }
        }
        stats
    })
}

/// 按顺序处理一个批次，单张图片失败不影响其他图片
async fn process_batch<S: VectorStore>(components: &Components<S>, batch: Batch) -> BatchResult {
    let start = Instant::now();
    debug!("[批次 {}] 开始处理 {} 个文件", batch.id, batch.len());

    let extractor = components.extractor.clone();
    let storage = components.storage.clone();
    let paths = batch.paths.clone();
    let batch_id = batch.id.clone();
    let prepared = spawn_blocking(move || {
        let mut ids = Vec::with_capacity(paths.len());
        let mut vectors = Vec::with_capacity(paths.len());
        let mut errors = 0;
        for path in &paths {
            match ingest_file(&*extractor, &storage, path) {
                Ok((id, vector)) => {
                    ids.push(id);
                    vectors.push(vector);
                }
                Err(e) => {
                    warn!("[批次 {}] 处理图片失败 {}: {}", batch_id, path.display(), e);
                    errors += 1;
                }
            }
        }
        (ids, vectors, errors)
    })
    .await;

    let (ids, vectors, errors) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("[批次 {}] 工作线程异常退出: {}", batch.id, e);
            metrics::inc_batch_failed();
            return BatchResult::failed(&batch, e);
        }
    };

    let processed = ids.len();
    if processed > 0 {
        // NOTE: 插入失败时已保存的副本不会被删除
        if let Err(e) = components.store.insert(ids, vectors).await {
            error!("[批次 {}] 插入向量库失败: {}", batch.id, e);
            metrics::inc_image_count(0, batch.len());
            metrics::inc_batch_failed();
            return BatchResult::failed(&batch, e);
        }
    }

    let elapsed = start.elapsed().as_secs_f32();
    metrics::inc_image_count(processed, errors);
    metrics::observe_batch_duration(elapsed);
    debug!("[批次 {}] 完成，成功 {}，失败 {}，耗时 {:.2}s", batch.id, processed, errors, elapsed);

    BatchResult { batch_id: batch.id, processed_count: processed, error_count: errors, fatal_error: None }
}

/// 读取、提取特征并保存标准化副本
fn ingest_file(
    extractor: &dyn FeatureExtractor,
    storage: &CanonicalStorage,
    path: &Path,
) -> Result<(String, FeatureVector), IngestError> {
    let image = imread(path)?;
    let vector = extractor.extract(&image)?;
    let id = uuid::Uuid::new_v4().to_string();
    let ext = path.extension().map(|ext| ext.to_string_lossy()).unwrap_or_default();
    storage.save(&image, &id, &ext)?;
    Ok((id, vector))
}
