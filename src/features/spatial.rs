use image::RgbImage;

/// 网格划分数量
pub const GRID: usize = 4;

/// 空间特征长度：4x4 网格，每个网格 3 个颜色通道
pub const SPATIAL_LEN: usize = GRID * GRID * 3;

/// 提取空间颜色特征
///
/// 将图像分为 4x4 网格，计算每个网格各通道的平均值并归一化到 [0, 1]，
/// 按行优先顺序输出。最后一行、最后一列吸收整除产生的余数像素。
pub fn spatial_grid(image: &RgbImage) -> [f32; SPATIAL_LEN] {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let (cell_w, cell_h) = (width / GRID, height / GRID);

    let mut features = [0f32; SPATIAL_LEN];
    for gy in 0..GRID {
        let y0 = gy * cell_h;
        let y1 = if gy == GRID - 1 { height } else { y0 + cell_h };
        for gx in 0..GRID {
            let x0 = gx * cell_w;
            let x1 = if gx == GRID - 1 { width } else { x0 + cell_w };

            let mut total = [0u64; 3];
            for y in y0..y1 {
                for x in x0..x1 {
                    let p = image.get_pixel(x as u32, y as u32);
                    for c in 0..3 {
                        total[c] += p.0[c] as u64;
                    }
                }
            }

            let count = ((x1 - x0) * (y1 - y0)) as f64;
            if count > 0. {
                let idx = (gy * GRID + gx) * 3;
                for c in 0..3 {
                    features[idx + c] = (total[c] as f64 / count / 255.) as f32;
                }
            }
        }
    }
    features
}
