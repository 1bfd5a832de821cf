mod histogram;
mod preprocess;
mod spatial;
mod texture;

use std::ops::Deref;

use image::DynamicImage;
use rayon::prelude::*;
use serde::Serialize;

pub use self::histogram::{BINS, HISTOGRAM_LEN, color_histogram};
pub use self::preprocess::preprocess;
pub use self::spatial::{GRID, SPATIAL_LEN, spatial_grid};
pub use self::texture::{TEXTURE_LEN, texture_features};
use crate::config::ExtractorOptions;
use crate::error::ExtractError;

/// 三种特征拼接后的自然长度
pub const NATURAL_LEN: usize = HISTOGRAM_LEN + TEXTURE_LEN + SPATIAL_LEN;

/// 固定长度、L2 归一化的图像特征向量
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|v| (*v as f64) * (*v as f64)).sum::<f64>().sqrt() as f32
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl Deref for FeatureVector {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

/// 图像特征提取器接口
pub trait FeatureExtractor: Send + Sync {
    /// 提取图像特征，相同的像素输入总是得到相同的向量
    fn extract(&self, image: &DynamicImage) -> Result<FeatureVector, ExtractError>;

    /// 特征向量维度
    fn dimension(&self) -> usize;

    /// 批量提取特征，任意一张失败则整体失败并返回第一张失败图片的下标
    fn extract_all(&self, images: &[DynamicImage]) -> Result<Vec<FeatureVector>, ExtractError> {
        if let Some(index) = images.iter().position(|img| img.width() == 0 || img.height() == 0) {
            let img = &images[index];
            let source = ExtractError::ZeroArea { width: img.width(), height: img.height() };
            return Err(ExtractError::AtIndex { index, source: Box::new(source) });
        }
        images
            .par_iter()
            .enumerate()
            .map(|(index, img)| {
                self.extract(img)
                    .map_err(|e| ExtractError::AtIndex { index, source: Box::new(e) })
            })
            .collect()
    }
}

/// 简单的特征提取器（基于颜色直方图、纹理特征和空间特征）
#[derive(Debug, Clone)]
pub struct SimpleExtractor {
    dimension: usize,
    image_size: u32,
    margin: u32,
}

impl SimpleExtractor {
    pub fn new(dimension: usize, image_size: u32, margin: u32) -> Self {
        Self { dimension, image_size, margin }
    }
}

impl Default for SimpleExtractor {
    fn default() -> Self {
        Self::from(&ExtractorOptions::default())
    }
}

impl From<&ExtractorOptions> for SimpleExtractor {
    fn from(opts: &ExtractorOptions) -> Self {
        Self::new(opts.dimension, opts.image_size, opts.margin)
    }
}

impl FeatureExtractor for SimpleExtractor {
    fn extract(&self, image: &DynamicImage) -> Result<FeatureVector, ExtractError> {
        let canonical = preprocess(image, self.image_size, self.margin)?;

        let mut features = Vec::with_capacity(NATURAL_LEN.max(self.dimension));
        features.extend_from_slice(&color_histogram(&canonical));
        features.extend_from_slice(&texture_features(&canonical));
        features.extend_from_slice(&spatial_grid(&canonical));

        Ok(combine(features, self.dimension))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// 填充或截断到 `dimension` 维，然后做 L2 归一化
///
/// 填充的零分量为以后新增的特征预留空间，不需要迁移向量库索引
pub fn combine(mut features: Vec<f32>, dimension: usize) -> FeatureVector {
    features.resize(dimension, 0.);
    l2_normalize(&mut features);
    FeatureVector(features)
}

/// L2 归一化，范数为 0 时保持原样
pub fn l2_normalize(features: &mut [f32]) {
    let norm = features.iter().map(|&v| v as f64 * v as f64).sum::<f64>().sqrt();
    if norm == 0. {
        return;
    }
    for v in features.iter_mut() {
        *v = (*v as f64 / norm) as f32;
    }
}
