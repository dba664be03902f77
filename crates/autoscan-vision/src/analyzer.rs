//! 정렬 분석기.
//!
//! 카메라 프레임 한 장을 활성 세그먼트 마스크에 대해 평가한다.
//!
//! 1. 작업 해상도(기본 192x144)로 다운스케일
//! 2. 밝기 = 평균 휘도
//! 3. 움직임 = 이전 작업 프레임 대비 평균 휘도 차 (stride 샘플링)
//! 4. 마스크 내부(알파 > 임계값) 픽셀에서만 3x3 Sobel
//! 5. 점수 = 0.6 * 에지 밀도 + 0.4 * 에지 강도
//!
//! 실패는 에러로 전파하지 않고 0 샘플로 표현한다.

use autoscan_core::config::VisionConfig;
use autoscan_core::error::CoreError;
use autoscan_core::models::frame::CameraFrame;
use autoscan_core::models::sample::AlignmentSample;
use autoscan_core::models::segment::{Segment, SegmentId};
use autoscan_core::ports::vision::FrameScorer;
use tracing::{debug, warn};

use crate::mask::{MaskCache, MaskRaster};
use crate::resize::{downscale_to_working, WorkingFrame};

/// 에지 밀도 가중치
const DENSITY_WEIGHT: f32 = 0.6;
/// 에지 강도 가중치
const STRENGTH_WEIGHT: f32 = 0.4;

/// 마스크 내부 Sobel 에지 통계
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeMetrics {
    /// 마스크 내부 픽셀 수
    pub in_mask: usize,
    /// 에지 픽셀 수
    pub edges: usize,
    /// edges / in_mask (마스크가 비어 있으면 0)
    pub density: f32,
    /// 에지 픽셀 평균 그래디언트 크기 / 255 (0 ~ 1)
    pub strength: f32,
}

impl EdgeMetrics {
    /// 정렬 점수
    pub fn score(&self) -> f32 {
        DENSITY_WEIGHT * self.density + STRENGTH_WEIGHT * self.strength
    }
}

/// 마스크 내부 픽셀에서 3x3 Sobel 에지 계산.
///
/// 커널이 프레임 밖으로 나가는 테두리 픽셀은 에지로 평가하지 않지만
/// 밀도의 분모(마스크 내부 픽셀 수)에는 포함된다.
pub fn masked_sobel(
    frame: &WorkingFrame,
    mask: &MaskRaster,
    alpha_threshold: u8,
    edge_threshold: f32,
) -> EdgeMetrics {
    let (w, h) = (frame.width as usize, frame.height as usize);
    if w < 3 || h < 3 || mask.width != frame.width || mask.height != frame.height {
        return EdgeMetrics::default();
    }

    let luma = &frame.luma;
    let in_mask = mask.count_inside(alpha_threshold);
    let mut edges = 0usize;
    let mut magnitude_sum = 0f64;

    for y in 1..h - 1 {
        let above = (y - 1) * w;
        let row = y * w;
        let below = (y + 1) * w;
        for x in 1..w - 1 {
            if !mask.contains(row + x, alpha_threshold) {
                continue;
            }

            let (l, r) = (x - 1, x + 1);
            let gx = (luma[above + r] + 2.0 * luma[row + r] + luma[below + r])
                - (luma[above + l] + 2.0 * luma[row + l] + luma[below + l]);
            let gy = (luma[below + l] + 2.0 * luma[below + x] + luma[below + r])
                - (luma[above + l] + 2.0 * luma[above + x] + luma[above + r]);
            let magnitude = (gx * gx + gy * gy).sqrt();

            if magnitude > edge_threshold {
                edges += 1;
                magnitude_sum += magnitude as f64;
            }
        }
    }

    let density = if in_mask == 0 {
        0.0
    } else {
        edges as f32 / in_mask as f32
    };
    let strength = if edges == 0 {
        0.0
    } else {
        ((magnitude_sum / edges as f64) / 255.0).clamp(0.0, 1.0) as f32
    };

    EdgeMetrics {
        in_mask,
        edges,
        density,
        strength,
    }
}

/// 이전 프레임 대비 평균 휘도 변화 (0 ~ 1)
///
/// 이전 프레임이 없거나 해상도가 다르면 0.
pub fn motion_between(previous: Option<&WorkingFrame>, current: &WorkingFrame, stride: u32) -> f32 {
    let Some(previous) = previous else {
        return 0.0;
    };
    if previous.width != current.width || previous.height != current.height {
        return 0.0;
    }

    let stride = stride.max(1) as usize;
    let (sum, count) = previous
        .luma
        .iter()
        .zip(&current.luma)
        .step_by(stride)
        .fold((0f64, 0usize), |(sum, count), (a, b)| {
            (sum + (a - b).abs() as f64, count + 1)
        });

    if count == 0 {
        0.0
    } else {
        (sum / count as f64 / 255.0) as f32
    }
}

/// 정렬 분석기: 마스크 캐시와 이전 작업 프레임을 필드로 소유
pub struct AlignmentAnalyzer {
    config: VisionConfig,
    masks: MaskCache,
    previous: Option<WorkingFrame>,
    active_segment: Option<SegmentId>,
}

impl AlignmentAnalyzer {
    /// 새 분석기 생성
    pub fn new(config: VisionConfig) -> Self {
        Self {
            config,
            masks: MaskCache::new(),
            previous: None,
            active_segment: None,
        }
    }

    /// 프레임 분석 (실패 시 에러 반환)
    pub fn analyze(
        &mut self,
        frame: &CameraFrame,
        segment: &Segment,
    ) -> Result<AlignmentSample, CoreError> {
        // 세그먼트가 바뀌면 이전 프레임 기준 움직임은 의미 없음
        if self.active_segment.as_ref() != Some(&segment.id) {
            self.reset();
            self.active_segment = Some(segment.id.clone());
        }

        let (work_w, work_h) = (self.config.working_width, self.config.working_height);
        let working = downscale_to_working(frame.width, frame.height, &frame.rgba, work_w, work_h)?;
        let mask = self.masks.get_or_render(segment, work_w, work_h)?;

        let brightness = working.mean_brightness();
        let motion = motion_between(self.previous.as_ref(), &working, self.config.motion_stride);
        let edges = masked_sobel(
            &working,
            &mask,
            self.config.mask_alpha_threshold,
            self.config.edge_threshold,
        );

        self.previous = Some(working);

        let sample = AlignmentSample::new(edges.score(), brightness, motion);
        debug!(
            "정렬 분석 [{}]: score={:.3} (density={:.3}, strength={:.3}), brightness={:.3}, motion={:.3}",
            segment.id, sample.score, edges.density, edges.strength, sample.brightness, sample.motion
        );
        Ok(sample)
    }
}

impl FrameScorer for AlignmentAnalyzer {
    fn score(&mut self, frame: &CameraFrame, segment: &Segment) -> AlignmentSample {
        match self.analyze(frame, segment) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("정렬 분석 실패 [{}], 0 샘플 반환: {e}", segment.id);
                AlignmentSample::zero()
            }
        }
    }

    fn reset(&mut self) {
        self.previous = None;
        self.masks.clear();
        self.active_segment = None;
    }
}
