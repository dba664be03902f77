//! 세그먼트 관심 영역 마스크.
//!
//! 정규화 다각형은 픽셀당 4x4 슈퍼샘플링으로 안티앨리어싱 래스터화하고,
//! 이미지 마스크는 알파(없으면 휘도) 채널을 작업 해상도로 리사이즈한다.
//! 래스터 결과는 LRU 캐시에 보관한다.

use autoscan_core::error::CoreError;
use autoscan_core::models::segment::{MaskSpec, Segment, SegmentId};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::resize::resize_rgba;

/// 슈퍼샘플 격자 한 변 (4x4 = 16 샘플)
const SUPERSAMPLE: u32 = 4;

/// 캐시 최대 크기
const CACHE_CAPACITY: usize = 16;

/// 작업 해상도에서 래스터화된 마스크 (픽셀별 커버리지 0-255)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskRaster {
    /// 너비
    pub width: u32,
    /// 높이
    pub height: u32,
    /// 커버리지 (알파)
    pub coverage: Vec<u8>,
}

impl MaskRaster {
    /// 전부 비어 있는 마스크
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            coverage: vec![0; width as usize * height as usize],
        }
    }

    /// 픽셀이 마스크 내부인지 (알파 > 임계값)
    #[inline]
    pub fn contains(&self, index: usize, alpha_threshold: u8) -> bool {
        self.coverage.get(index).is_some_and(|&a| a > alpha_threshold)
    }

    /// 임계값을 넘는 픽셀 수
    pub fn count_inside(&self, alpha_threshold: u8) -> usize {
        self.coverage.iter().filter(|&&a| a > alpha_threshold).count()
    }
}

/// 정규화 다각형 래스터화
///
/// 꼭짓점이 3개 미만이면 빈 마스크.
pub fn rasterize_polygon(points: &[[f32; 2]], width: u32, height: u32) -> MaskRaster {
    let mut raster = MaskRaster::empty(width, height);
    if points.len() < 3 || width == 0 || height == 0 {
        return raster;
    }

    let polygon: Vec<(f32, f32)> = points
        .iter()
        .map(|[x, y]| (x * width as f32, y * height as f32))
        .collect();

    let (min_y, max_y) = polygon
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), &(_, y)| (lo.min(y), hi.max(y)));
    let row_start = min_y.floor().max(0.0) as u32;
    let row_end = (max_y.ceil().max(0.0) as u32).min(height);

    let samples = SUPERSAMPLE * SUPERSAMPLE;
    let step = 1.0 / SUPERSAMPLE as f32;

    for py in row_start..row_end {
        for px in 0..width {
            let mut hits = 0u32;
            for sy in 0..SUPERSAMPLE {
                for sx in 0..SUPERSAMPLE {
                    let x = px as f32 + (sx as f32 + 0.5) * step;
                    let y = py as f32 + (sy as f32 + 0.5) * step;
                    if point_in_polygon(&polygon, x, y) {
                        hits += 1;
                    }
                }
            }
            if hits > 0 {
                let idx = (py * width + px) as usize;
                raster.coverage[idx] = ((hits * 255 + samples / 2) / samples) as u8;
            }
        }
    }

    raster
}

/// even-odd 규칙
fn point_in_polygon(polygon: &[(f32, f32)], x: f32, y: f32) -> bool {
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// 마스크 이미지 파일 로드 후 작업 해상도로 변환
///
/// 불투명하지 않은 픽셀이 하나라도 있으면 알파 채널, 아니면 휘도를 커버리지로 쓴다.
pub fn load_image_mask(path: &Path, width: u32, height: u32) -> Result<MaskRaster, CoreError> {
    let image = image::open(path).map_err(|e| match e {
        image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            CoreError::NotFound {
                resource_type: "Mask".to_string(),
                id: path.display().to_string(),
            }
        }
        other => CoreError::Media(format!("마스크 이미지 로드 실패: {}: {other}", path.display())),
    })?;

    let rgba = image.to_rgba8();
    let (src_w, src_h) = rgba.dimensions();
    let resized = resize_rgba(src_w, src_h, rgba.as_raw(), width, height)?;

    let has_alpha = resized.chunks_exact(4).any(|px| px[3] < u8::MAX);
    let coverage = resized
        .chunks_exact(4)
        .map(|px| {
            if has_alpha {
                px[3]
            } else {
                (0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32).round() as u8
            }
        })
        .collect();

    debug!("마스크 이미지 로드: {} → {}x{}", path.display(), width, height);
    Ok(MaskRaster {
        width,
        height,
        coverage,
    })
}

/// 마스크 정의를 래스터화
pub fn render(spec: &MaskSpec, width: u32, height: u32) -> Result<MaskRaster, CoreError> {
    match spec {
        MaskSpec::Polygon { points } => Ok(rasterize_polygon(points, width, height)),
        MaskSpec::Image { path } => load_image_mask(path, width, height),
    }
}

/// 세그먼트별 마스크 래스터 캐시
pub struct MaskCache {
    cache: LruCache<(SegmentId, u32, u32), Arc<MaskRaster>>,
}

impl MaskCache {
    /// 기본 용량으로 생성
    pub fn new() -> Self {
        Self::with_capacity(CACHE_CAPACITY)
    }

    /// 지정 용량으로 생성 (0이면 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// 캐시 조회, 없으면 래스터화 후 저장
    pub fn get_or_render(
        &mut self,
        segment: &Segment,
        width: u32,
        height: u32,
    ) -> Result<Arc<MaskRaster>, CoreError> {
        let key = (segment.id.clone(), width, height);
        if let Some(raster) = self.cache.get(&key) {
            return Ok(Arc::clone(raster));
        }
        let raster = Arc::new(render(&segment.mask, width, height)?);
        debug!("마스크 래스터화: {} ({}x{})", segment.id, width, height);
        self.cache.put(key, Arc::clone(&raster));
        Ok(raster)
    }

    /// 캐시 항목 수
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// 비어 있는지
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// 캐시 초기화
    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for MaskCache {
    fn default() -> Self {
        Self::new()
    }
}
