use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage};

use crate::error::ExtractError;

/// 预处理图像：等比缩放使短边为 `size + margin`，然后中心裁剪到 `size x size`
///
/// 先在原图上裁出缩放后会落入中心区域的部分，再只缩放这一部分，
/// 内存占用只取决于 `size`，与原图长宽比无关。
pub fn preprocess(image: &DynamicImage, size: u32, margin: u32) -> Result<RgbImage, ExtractError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ExtractError::ZeroArea { width, height });
    }

    let (scaled_width, scaled_height) = scale_short_side(width, height, size + margin);
    let (x, crop_width) = source_span(width, scaled_width, size);
    let (y, crop_height) = source_span(height, scaled_height, size);
    let region = image.crop_imm(x, y, crop_width, crop_height).to_rgb8();

    Ok(imageops::resize(&region, size, size, FilterType::Lanczos3))
}

/// 计算短边缩放到 `short` 后的尺寸，长边四舍五入且不小于 `short`
fn scale_short_side(width: u32, height: u32, short: u32) -> (u32, u32) {
    let scale = |long: u32, base: u32| -> u32 {
        let v = (long as u64 * short as u64 + base as u64 / 2) / base as u64;
        (v.min(u32::MAX as u64) as u32).max(short)
    };
    if width <= height {
        (short, scale(height, width))
    } else {
        (scale(width, height), short)
    }
}

/// 缩放后居中的 `size` 像素在原图中对应的起点和长度
///
/// `scaled >= size`，长度至少为 1 且不越界
fn source_span(source: u32, scaled: u32, size: u32) -> (u32, u32) {
    let (source, scaled, size) = (source as u64, scaled as u64, size as u64);
    let offset = (scaled - size) / 2;
    let start = offset * source / scaled;
    let len = (size * source).div_ceil(scaled).clamp(1, source - start);
    (start as u32, len as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([10, 20, 30])))
    }

    #[test]
    fn test_scale_short_side() {
        assert_eq!(scale_short_side(100, 200, 274), (274, 548));
        assert_eq!(scale_short_side(300, 150, 274), (548, 274));
        assert_eq!(scale_short_side(50, 50, 274), (274, 274));
    }

    #[test]
    fn test_preprocess_square_output() {
        for (w, h) in [(32, 32), (640, 480), (100, 1000), (3, 7)] {
            let out = preprocess(&solid(w, h), 224, 50).unwrap();
            assert_eq!(out.dimensions(), (224, 224), "{}x{}", w, h);
        }
    }

    #[test]
    fn test_source_span() {
        // 100x200 缩放到 274x548，中心 224 对应原图 [9, 91) 和 [59, 141)
        assert_eq!(source_span(100, 274, 224), (9, 82));
        assert_eq!(source_span(200, 548, 224), (59, 82));
        // 不需要裁剪时取整条边
        assert_eq!(source_span(50, 64, 64), (0, 50));
    }

    #[test]
    fn test_preprocess_extreme_aspect() {
        for (w, h) in [(1, 20000), (20000, 1), (2, 1_000_000)] {
            let out = preprocess(&solid(w, h), 224, 50).unwrap();
            assert_eq!(out.dimensions(), (224, 224), "{}x{}", w, h);
            assert_eq!(out.get_pixel(112, 112), &Rgb([10, 20, 30]));
        }
    }

    #[test]
    fn test_preprocess_uniform_scaling() {
        // 仅相差等比缩放的两张图，得到相同的标准尺寸
        let a = preprocess(&solid(160, 120), 64, 8).unwrap();
        let b = preprocess(&solid(320, 240), 64, 8).unwrap();
        assert_eq!(a.dimensions(), b.dimensions());
    }

    #[test]
    fn test_preprocess_zero_area() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 10));
        assert!(matches!(
            preprocess(&img, 224, 50),
            Err(ExtractError::ZeroArea { width: 0, height: 10 })
        ));
    }
}
