use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use image::DynamicImage;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::task::spawn_blocking;

use crate::config::{ConfDir, ExtractorOptions, PipelineOptions};
use crate::db::ImageRecord;
use crate::error::{IngestError, PipelineError};
use crate::features::{FeatureExtractor, FeatureVector, SimpleExtractor};
use crate::metrics;
use crate::pipeline::{AggregateStats, BatchPipeline};
use crate::storage::CanonicalStorage;
use crate::store::{SqliteStore, StoreStats, VectorStore};
use crate::utils::{self, unix_timestamp};

/// 单条搜索结果
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub id: String,
    /// 平方欧氏距离
    pub distance: f32,
    /// 相似度百分比，例如 `87.5%`
    pub similarity: String,
    /// 标准化副本路径，副本已被删除时为空
    pub stored_path: Option<PathBuf>,
}

/// 系统统计信息
#[derive(Debug, Clone, Serialize)]
pub struct DbStats {
    pub store: StoreStats,
    pub feature_dimension: usize,
    pub storage_root: PathBuf,
}

pub struct IMDBBuilder {
    conf_dir: ConfDir,
    extractor: ExtractorOptions,
}

impl IMDBBuilder {
    pub fn new(conf_dir: ConfDir) -> Self {
        Self { conf_dir, extractor: ExtractorOptions::default() }
    }

    pub fn extractor(mut self, opts: ExtractorOptions) -> Self {
        self.extractor = opts;
        self
    }

    /// 打开配置目录下的持久化向量库
    pub async fn open(self) -> anyhow::Result<IMDB> {
        std::fs::create_dir_all(self.conf_dir.path())
            .with_context(|| format!("无法创建配置目录 {}", self.conf_dir))?;
        let store = SqliteStore::open(self.conf_dir.database(), self.extractor.dimension).await?;
        Ok(self.open_with(store))
    }

    /// 使用指定的向量库
    pub fn open_with<S: VectorStore>(self, store: S) -> IMDB<S> {
        IMDB {
            extractor: Arc::new(SimpleExtractor::from(&self.extractor)),
            store: Arc::new(store),
            storage: Arc::new(CanonicalStorage::new(self.conf_dir.images())),
        }
    }
}

pub struct IMDB<S = SqliteStore> {
    extractor: Arc<dyn FeatureExtractor>,
    store: Arc<S>,
    storage: Arc<CanonicalStorage>,
}

impl<S: VectorStore + 'static> IMDB<S> {
    pub fn dimension(&self) -> usize {
        self.extractor.dimension()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn storage(&self) -> &CanonicalStorage {
        &self.storage
    }

    /// 在阻塞线程池中提取单张图片的特征
    pub async fn extract(&self, image: DynamicImage) -> Result<FeatureVector, IngestError> {
        let extractor = self.extractor.clone();
        Ok(spawn_blocking(move || extractor.extract(&image)).await??)
    }

    /// 上传一张图片：解码、提取特征、保存副本并插入向量库
    pub async fn upload(&self, filename: &str, data: &[u8]) -> Result<ImageRecord, IngestError> {
        utils::check_format(filename)?;
        let ext = Path::new(filename).extension().map(|ext| ext.to_string_lossy().into_owned()).unwrap_or_default();

        let extractor = self.extractor.clone();
        let storage = self.storage.clone();
        let data = data.to_vec();
        let (id, vector, stored_path) = spawn_blocking(move || -> Result<_, IngestError> {
            let image = utils::imdecode(&data)?;
            let vector = extractor.extract(&image)?;
            let id = uuid::Uuid::new_v4().to_string();
            let stored_path = storage.save(&image, &id, &ext)?;
            Ok((id, vector, stored_path))
        })
        .await??;

        if let Err(e) = self.store.insert(vec![id.clone()], vec![vector.clone()]).await {
            // 单张上传失败时清理副本，避免留下没有向量的文件
            if let Err(e) = self.storage.remove(&id) {
                warn!("清理图片副本失败 {}: {}", id, e);
            }
            return Err(e.into());
        }
        metrics::inc_image_count(1, 0);
        info!("图片上传成功: {} -> {}", filename, id);

        Ok(ImageRecord { id, vector, stored_path, inserted_at: unix_timestamp() })
    }

    /// 以图搜图，返回按距离升序排列的结果
    pub async fn search(&self, data: &[u8], k: usize) -> Result<Vec<SearchMatch>, IngestError> {
        let data = data.to_vec();
        let image = spawn_blocking(move || utils::imdecode(&data)).await??;
        self.search_image(image, k).await
    }

    pub async fn search_image(&self, image: DynamicImage, k: usize) -> Result<Vec<SearchMatch>, IngestError> {
        let start = Instant::now();
        let size = (image.width(), image.height());
        let query = self.extract(image).await?;
        let hits = self.store.search(&query, k).await?;

        let result = hits
            .into_iter()
            .map(|hit| SearchMatch {
                stored_path: self.storage.locate(&hit.id),
                similarity: format!("{:.1}%", similarity(hit.distance)),
                distance: hit.distance,
                id: hit.id,
            })
            .collect::<Vec<_>>();

        let elapsed = start.elapsed().as_secs_f32();
        metrics::observe_search_duration(size, elapsed);
        if let Some(best) = result.first() {
            metrics::observe_search_max_similarity(similarity(best.distance));
        }
        debug!("搜索完成，{} 个结果，耗时 {:.3}s", result.len(), elapsed);

        Ok(result)
    }

    /// 删除图片，先删除向量再删除副本，返回向量库中是否存在该图片
    pub async fn delete(&self, id: &str) -> Result<bool, IngestError> {
        let existed = self.store.delete(id).await?;
        let removed = self.storage.remove(id)?;
        info!("删除图片 {}: 向量 {}，副本 {}", id, existed, removed);
        Ok(existed)
    }

    pub async fn stats(&self) -> Result<DbStats, IngestError> {
        Ok(DbStats {
            store: self.store.stats().await?,
            feature_dimension: self.dimension(),
            storage_root: self.storage.root().to_path_buf(),
        })
    }

    /// 检查向量库是否可用
    pub async fn health(&self) -> Result<(), IngestError> {
        self.store.stats().await?;
        Ok(())
    }

    /// 批量入库目录中的所有图片
    pub async fn ingest_dir(
        &self,
        root: impl AsRef<Path>,
        opts: PipelineOptions,
        pb: ProgressBar,
    ) -> Result<AggregateStats, PipelineError> {
        BatchPipeline::new(self.extractor.clone(), self.store.clone(), self.storage.clone(), opts)
            .with_progress(pb)
            .run(root)
            .await
    }
}

/// 将平方欧氏距离转换为 0-100 的相似度
pub fn similarity(distance: f32) -> f32 {
    ((1.0 - distance) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;
    use crate::error::{DecodeError, StoreError};
    use crate::store::MemoryStore;

    fn png(color: [u8; 3]) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 { Rgb(color) } else { Rgb([255 - color[0], 128, color[2] / 2]) }
        }));
        let mut buf = Cursor::new(vec![]);
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn open(dir: &Path) -> IMDB<MemoryStore> {
        let opts = ExtractorOptions { dimension: 128, image_size: 32, margin: 8 };
        IMDBBuilder::new(ConfDir::new(dir)).extractor(opts).open_with(MemoryStore::new(128))
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity(0.0), 100.0);
        assert_eq!(similarity(0.25), 75.0);
        assert_eq!(similarity(3.0), 0.0);
        assert_eq!(format!("{:.1}%", similarity(0.1234)), "87.7%");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_upload_search_delete() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(dir.path());

        let red = db.upload("red.png", &png([250, 10, 10])).await.unwrap();
        let blue = db.upload("blue.JPG", &png([10, 10, 250])).await.unwrap();
        assert!(red.stored_path.ends_with(format!("{}.png", red.id)));
        assert!(blue.stored_path.ends_with(format!("{}.jpg", blue.id)));
        assert_eq!(red.vector.len(), 128);

        let result = db.search(&png([250, 10, 10]), 2).await.unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, red.id);
        assert_eq!(result[0].similarity, "100.0%");
        assert_eq!(result[0].stored_path.as_deref(), Some(red.stored_path.as_path()));

        assert!(db.delete(&red.id).await.unwrap());
        assert!(!red.stored_path.exists());
        assert!(!db.delete(&red.id).await.unwrap());
        assert_eq!(db.stats().await.unwrap().store.count, 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(dir.path());

        let err = db.upload("a.gif", &png([1, 2, 3])).await.unwrap_err();
        assert!(matches!(err, IngestError::Decode(DecodeError::Unsupported(_))));

        let err = db.upload("a.png", b"not an image").await.unwrap_err();
        assert!(matches!(err, IngestError::Decode(DecodeError::Codec(_))));

        let err = db.search(&png([1, 2, 3]), 0).await.unwrap_err();
        assert!(matches!(err, IngestError::Store(StoreError::InvalidK(0))));
        assert!(db.store().is_empty());
    }
}
