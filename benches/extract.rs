use std::hint::black_box;
use std::io::Cursor;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imvec::features::{
    FeatureExtractor, SimpleExtractor, color_histogram, preprocess, spatial_grid, texture_features,
};
use imvec::store::{MemoryStore, VectorStore};
use imvec::utils;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_image(width: u32, height: u32, seed: u64) -> DynamicImage {
    let mut rng = StdRng::seed_from_u64(seed);
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| Rgb(rng.random())))
}

fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(vec![]);
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

fn benchmark_extract(c: &mut Criterion) {
    let extractor = SimpleExtractor::default();
    let img = random_image(1024, 768, 0);
    let canonical = preprocess(&img, 224, 50).unwrap();
    let png = encode(&img, ImageFormat::Png);
    let jpg = encode(&img, ImageFormat::Jpeg);

    let mut group = c.benchmark_group("特征提取");
    group.throughput(Throughput::Elements(1));
    group.bench_function("完整提取", |b| b.iter(|| extractor.extract(black_box(&img))));
    group.bench_function("预处理", |b| b.iter(|| preprocess(black_box(&img), 224, 50)));
    group.bench_function("颜色直方图", |b| b.iter(|| color_histogram(black_box(&canonical))));
    group.bench_function("纹理特征", |b| b.iter(|| texture_features(black_box(&canonical))));
    group.bench_function("空间特征", |b| b.iter(|| spatial_grid(black_box(&canonical))));
    group.bench_function("PNG 解码", |b| b.iter(|| utils::imdecode(black_box(&png))));
    group.bench_function("JPEG 解码", |b| b.iter(|| utils::imdecode(black_box(&jpg))));
    group.finish();
}

fn benchmark_search(c: &mut Criterion) {
    let extractor = SimpleExtractor::new(512, 64, 8);
    let images = (0..32).map(|i| random_image(96, 96, i)).collect::<Vec<_>>();
    let vectors = extractor.extract_all(&images).unwrap();
    let ids = (0..vectors.len()).map(|i| i.to_string()).collect::<Vec<_>>();
    let query = vectors[0].clone();

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let store = MemoryStore::new(512);
    rt.block_on(store.insert(ids, vectors)).unwrap();

    let mut group = c.benchmark_group("向量搜索");
    group.bench_function("内存 top10", |b| b.iter(|| rt.block_on(store.search(black_box(&query), 10))));
    group.finish();
}

criterion_group!(benches, benchmark_extract, benchmark_search);
criterion_main!(benches);
