use image::RgbImage;

/// 每个通道的 bin 数量
pub const BINS: usize = 16;

/// 颜色直方图特征长度
pub const HISTOGRAM_LEN: usize = BINS * 3;

/// 提取 RGB 颜色直方图，每个通道 16 个等宽 bin，按像素总数归一化
///
/// 输出顺序为 R 通道 16 个 bin，G 通道 16 个 bin，B 通道 16 个 bin
pub fn color_histogram(image: &RgbImage) -> [f32; HISTOGRAM_LEN] {
    let mut hist = [0u32; HISTOGRAM_LEN];
    for pixel in image.pixels() {
        for (channel, &value) in pixel.0.iter().enumerate() {
            hist[channel * BINS + bin_of(value)] += 1;
        }
    }

    let total = (image.width() as u64 * image.height() as u64) as f32;
    let mut features = [0f32; HISTOGRAM_LEN];
    if total > 0. {
        for (f, &count) in features.iter_mut().zip(hist.iter()) {
            *f = count as f32 / total;
        }
    }
    features
}

#[inline]
fn bin_of(value: u8) -> usize {
    (value as usize / (256 / BINS)).min(BINS - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_bin_edges() {
        assert_eq!(bin_of(0), 0);
        assert_eq!(bin_of(15), 0);
        assert_eq!(bin_of(16), 1);
        assert_eq!(bin_of(254), 15);
        assert_eq!(bin_of(255), 15);
    }

    #[test]
    fn test_solid_red() {
        let img = RgbImage::from_pixel(8, 8, Rgb([255, 0, 0]));
        let hist = color_histogram(&img);
        assert_eq!(hist[15], 1.0);
        assert_eq!(hist[BINS], 1.0);
        assert_eq!(hist[2 * BINS], 1.0);
        assert_eq!(hist.iter().sum::<f32>(), 3.0);
    }

    #[test]
    fn test_each_channel_sums_to_one() {
        let img = RgbImage::from_fn(17, 9, |x, y| Rgb([(x * 15) as u8, (y * 28) as u8, (x + y) as u8]));
        let hist = color_histogram(&img);
        for channel in hist.chunks(BINS) {
            assert!((channel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
    }
}
