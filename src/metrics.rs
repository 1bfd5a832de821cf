use std::sync::LazyLock;

use prometheus::*;

static METRIC_IMAGE_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!("imvec_image_count", "count of the ingested images", &["result"])
        .expect("failed to register metric")
});

static METRIC_BATCH_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_int_counter!("imvec_batch_failed", "count of the batches whose insert failed")
        .expect("failed to register metric")
});

static METRIC_BATCH_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "imvec_batch_duration",
        "duration of the per-batch processing in seconds",
        exponential_buckets(0.05, 2.0, 12).expect("invalid buckets")
    )
    .expect("failed to register metric")
});

static METRIC_SEARCH_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "imvec_search_duration",
        "duration of the per-image search in seconds",
        &["size"]
    )
    .expect("failed to register metric")
});

static METRIC_SEARCH_MAX_SIMILARITY: LazyLock<Histogram> = LazyLock::new(|| {
    register_histogram!(
        "imvec_search_max_similarity",
        "max similarity of the per-image search",
        (5..=100).step_by(5).map(|x| x as f64).collect()
    )
    .expect("failed to register metric")
});

/// 记录入库成功和失败的图片数量
pub fn inc_image_count(ok: usize, failed: usize) {
    METRIC_IMAGE_COUNT.with_label_values(&["ok"]).inc_by(ok as u64);
    METRIC_IMAGE_COUNT.with_label_values(&["failed"]).inc_by(failed as u64);
}

pub fn inc_batch_failed() {
    METRIC_BATCH_FAILED.inc();
}

pub fn observe_batch_duration(duration: f32) {
    METRIC_BATCH_DURATION.observe(duration as f64);
}

pub fn observe_search_duration(size: (u32, u32), duration: f32) {
    METRIC_SEARCH_DURATION.with_label_values(&[to_fixed_size(size)]).observe(duration as f64);
}

pub fn observe_search_max_similarity(similarity: f32) {
    METRIC_SEARCH_MAX_SIMILARITY.observe(similarity as f64);
}

/// 以文本格式导出所有指标
pub fn render() -> Result<String> {
    TextEncoder::new().encode_to_string(&gather())
}

/// 将图像面积范围调整到几个固定值
fn to_fixed_size((width, height): (u32, u32)) -> &'static str {
    let area = width as u64 * height as u64;
    if area <= 128 * 128 {
        "128"
    } else if area <= 256 * 256 {
        "256"
    } else if area <= 512 * 512 {
        "512"
    } else if area <= 1024 * 1024 {
        "1024"
    } else if area <= 2048 * 2048 {
        "2048"
    } else {
        "2048+"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_size() {
        assert_eq!(to_fixed_size((100, 100)), "128");
        assert_eq!(to_fixed_size((300, 300)), "512");
        assert_eq!(to_fixed_size((5000, 5000)), "2048+");
    }

    #[test]
    fn test_render() {
        inc_image_count(3, 1);
        let text = render().unwrap();
        assert!(text.contains("imvec_image_count"));
    }
}
