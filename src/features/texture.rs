use image::RgbImage;

/// 纹理特征长度：对比度、能量、均匀性、边缘强度
pub const TEXTURE_LEN: usize = 4;

const SOBEL_X: [[f32; 3]; 3] = [[-1., 0., 1.], [-2., 0., 2.], [-1., 0., 1.]];
const SOBEL_Y: [[f32; 3]; 3] = [[-1., -2., -1.], [0., 0., 0.], [1., 2., 1.]];

/// 灰度图，像素值范围 [0, 1]
pub struct GrayImage {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl GrayImage {
    pub fn from_rgb(image: &RgbImage) -> Self {
        let data = image
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) as f32 / 255.
            })
            .collect();
        Self { width: image.width() as usize, height: image.height() as usize, data }
    }

    #[inline]
    fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }
}

/// 提取纹理特征（灰度共生矩阵的简化版本）
///
/// 返回 `[contrast, energy, uniformity, edge_strength]`，其中 uniformity 与 energy 相同
pub fn texture_features(image: &RgbImage) -> [f32; TEXTURE_LEN] {
    let gray = GrayImage::from_rgb(image);
    let energy = energy(&gray);
    [contrast(&gray), energy, energy, edge_strength(&gray)]
}

/// 每个像素与右侧、下方像素差值的平方和，按内部像素对数量归一化
fn contrast(gray: &GrayImage) -> f32 {
    let (w, h) = (gray.width, gray.height);
    if w < 2 || h < 2 {
        return 0.;
    }
    let mut sum = 0f32;
    for y in 0..h - 1 {
        for x in 0..w - 1 {
            let p = gray.at(x, y);
            let dx = p - gray.at(x + 1, y);
            let dy = p - gray.at(x, y + 1);
            sum += dx * dx + dy * dy;
        }
    }
    sum / ((w - 1) * (h - 1)) as f32
}

/// 全图灰度平方的均值
fn energy(gray: &GrayImage) -> f32 {
    if gray.data.is_empty() {
        return 0.;
    }
    gray.data.iter().map(|v| v * v).sum::<f32>() / gray.data.len() as f32
}

/// Sobel 梯度幅值在所有内部像素上的均值
fn edge_strength(gray: &GrayImage) -> f32 {
    let (w, h) = (gray.width, gray.height);
    if w < 3 || h < 3 {
        return 0.;
    }
    let mut total = 0f32;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let (mut gx, mut gy) = (0f32, 0f32);
            for ky in 0..3 {
                for kx in 0..3 {
                    let p = gray.at(x + kx - 1, y + ky - 1);
                    gx += p * SOBEL_X[ky][kx];
                    gy += p * SOBEL_Y[ky][kx];
                }
            }
            total += (gx * gx + gy * gy).sqrt();
        }
    }
    total / ((w - 2) * (h - 2)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_solid_image_has_no_variation() {
        let img = RgbImage::from_pixel(16, 16, Rgb([255, 0, 0]));
        let [contrast, energy, uniformity, edge] = texture_features(&img);
        assert_eq!(contrast, 0.);
        assert_eq!(edge, 0.);
        assert_eq!(energy, uniformity);
        let gray = 0.299f32;
        assert!((energy - gray * gray).abs() < 1e-4);
    }

    #[test]
    fn test_vertical_stripe_edges() {
        // 左半黑、右半白，只有中间一列存在梯度
        let img = RgbImage::from_fn(8, 8, |x, _| if x < 4 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let [contrast, energy, _, edge] = texture_features(&img);
        // 7x7 个像素对中有 7 个水平差值为 1
        assert!((contrast - 7. / 49.).abs() < 1e-4);
        assert!((energy - 0.5).abs() < 1e-4);
        // 6x6 个内部像素中有两列梯度幅值为 4
        assert!((edge - 4. * 12. / 36.).abs() < 1e-3);
    }

    #[test]
    fn test_tiny_image() {
        let img = RgbImage::from_pixel(1, 1, Rgb([128, 128, 128]));
        let [contrast, _, _, edge] = texture_features(&img);
        assert_eq!(contrast, 0.);
        assert_eq!(edge, 0.);
    }
}
