use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use indicatif::ProgressBar;
use log::{error, info};
use tokio::sync::mpsc::channel;
use tokio::task::JoinError;

mod tasks;
mod types;

use tasks::*;
pub use types::*;

use crate::config::PipelineOptions;
use crate::discovery::discover;
use crate::error::PipelineError;
use crate::features::FeatureExtractor;
use crate::storage::CanonicalStorage;
use crate::store::VectorStore;

/// 批量入库流水线
///
/// 一个分发任务、`workers` 个工作任务和一个收集任务，通过两个有界队列通信
pub struct BatchPipeline<S> {
    components: Components<S>,
    opts: PipelineOptions,
    pb: ProgressBar,
    state: AtomicU8,
}

impl<S: VectorStore + 'static> BatchPipeline<S> {
    pub fn new(
        extractor: Arc<dyn FeatureExtractor>,
        store: Arc<S>,
        storage: Arc<CanonicalStorage>,
        opts: PipelineOptions,
    ) -> Self {
        Self {
            components: Components { extractor, store, storage },
            opts,
            pb: ProgressBar::hidden(),
            state: AtomicU8::new(RunState::Idle as u8),
        }
    }

    /// 使用进度条显示已处理的文件数量
    pub fn with_progress(mut self, pb: ProgressBar) -> Self {
        self.pb = pb;
        self
    }

    pub fn state(&self) -> RunState {
        RunState::from(self.state.load(Ordering::Acquire))
    }

    /// 扫描目录并入库所有图片
    ///
    /// 只有目录遍历失败会中止整个运行，单张图片和单个批次的失败都会计入统计
    pub async fn run(&self, root: impl AsRef<Path>) -> Result<AggregateStats, PipelineError> {
        let files = discover(root)?;
        self.run_files(files).await
    }

    /// 入库给定的文件列表，顺序即批次划分顺序
    pub async fn run_files(&self, files: Vec<PathBuf>) -> Result<AggregateStats, PipelineError> {
        let total = files.len();
        let batches = partition(files, self.opts.batch_size);
        info!(
            "共 {} 个文件，分为 {} 个批次，{} 个工作任务",
            total,
            batches.len(),
            self.opts.workers
        );
        self.pb.set_length(total as u64);
        self.set_state(RunState::Dispatching);

        let capacity = self.opts.channel_capacity;
        let (result_tx, result_rx) = channel(capacity);
        let collector = task_collect(result_rx, self.opts.report_every, self.pb.clone());
        let (dispatcher, job_rx) = task_dispatch(batches, capacity);
        let workers = task_workers(job_rx, self.opts.workers, result_tx.clone(), self.components.clone());

        let dispatched = joined("分发", dispatcher.await);
        self.set_state(RunState::Draining);

        for worker in workers {
            if let Err(e) = worker.await {
                error!("工作任务异常退出: {}", e);
            }
        }
        // 所有工作任务结束后才关闭结果队列
        drop(result_tx);
        let collected = joined("收集", collector.await);

        self.set_state(RunState::Done);
        dispatched?;
        let stats = collected?;
        info!(
            "入库完成：{} 个批次，成功 {} 张，失败 {} 张，失败批次 {} 个",
            stats.batches_seen, stats.total_processed, stats.total_errors, stats.batches_failed
        );
        Ok(stats)
    }

    fn set_state(&self, state: RunState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// 记录并转换分发、收集任务的异常退出
fn joined<T>(task: &'static str, result: Result<T, JoinError>) -> Result<T, PipelineError> {
    result.map_err(|source| {
        error!("{}任务异常退出: {}", task, source);
        PipelineError::Task { task, source }
    })
}
