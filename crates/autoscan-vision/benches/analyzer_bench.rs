//! autoscan-vision 성능 벤치마크
//!
//! 실행: cargo bench -p autoscan-vision
//!
//! 벤치마크 대상:
//! - 프레임 분석 (AlignmentAnalyzer::analyze)
//! - 다각형 마스크 래스터화 (rasterize_polygon)
//! - 스틸 인코딩 (encode_still)

use autoscan_core::config::{AppConfig, StillFormat, VisionConfig};
use autoscan_core::models::frame::CameraFrame;
use autoscan_core::models::segment::{MaskSpec, Segment};
use autoscan_vision::{analyzer::AlignmentAnalyzer, encoder, mask};
use std::hint::black_box;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// 테스트용 패턴 프레임 생성
fn create_test_frame(width: u32, height: u32, seed: u8) -> CameraFrame {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = (x as u8).wrapping_add(seed).wrapping_mul(17);
            let g = (y as u8).wrapping_add(seed).wrapping_mul(31);
            let b = (x as u8).wrapping_add(y as u8).wrapping_add(seed);
            rgba.extend_from_slice(&[r, g, b, 255]);
        }
    }
    CameraFrame::new(width, height, rgba)
}

fn front_segment() -> Segment {
    let config = AppConfig::default_config();
    Segment::from_definition(&config.segments[0], 0)
}

/// 프레임 분석 벤치마크
fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    let segment = front_segment();

    for (width, height) in [(640, 480), (1280, 720), (1920, 1080)] {
        group.throughput(Throughput::Elements((width * height) as u64));
        let frames = [
            create_test_frame(width, height, 1),
            create_test_frame(width, height, 7),
        ];
        let mut analyzer = AlignmentAnalyzer::new(VisionConfig::default());
        let mut i = 0usize;

        group.bench_with_input(
            BenchmarkId::new("frame", format!("{width}x{height}")),
            &frames,
            |b, frames| {
                b.iter(|| {
                    i = (i + 1) % frames.len();
                    black_box(analyzer.analyze(&frames[i], &segment))
                })
            },
        );
    }

    group.finish();
}

/// 마스크 래스터화 벤치마크
fn bench_mask(c: &mut Criterion) {
    let MaskSpec::Polygon { points } = front_segment().mask else {
        return;
    };
    c.bench_function("rasterize_polygon_192x144", |b| {
        b.iter(|| black_box(mask::rasterize_polygon(&points, 192, 144)))
    });
}

/// 스틸 인코딩 벤치마크
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_still");
    let frame = create_test_frame(1280, 720, 42);

    for format in [StillFormat::Jpeg, StillFormat::Webp] {
        group.bench_with_input(
            BenchmarkId::new("1280x720", format.extension()),
            &format,
            |b, &format| b.iter(|| black_box(encoder::encode_still(&frame, format, 85))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_analyze, bench_mask, bench_encode);
criterion_main!(benches);
