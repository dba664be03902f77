//! 정렬 샘플 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 카메라 프레임 한 장을 활성 세그먼트 마스크에 대해 평가한 결과.
///
/// 모든 값은 0.0 ~ 1.0 범위.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentSample {
    /// 정렬 점수 (0.6 * 에지 밀도 + 0.4 * 에지 강도)
    pub score: f32,
    /// 평균 휘도
    pub brightness: f32,
    /// 이전 프레임 대비 평균 휘도 변화
    pub motion: f32,
    /// 평가 시각
    pub timestamp: DateTime<Utc>,
}

impl AlignmentSample {
    /// 새 샘플 생성 (값은 0.0 ~ 1.0으로 클램프)
    pub fn new(score: f32, brightness: f32, motion: f32) -> Self {
        Self {
            score: clamp_unit(score),
            brightness: clamp_unit(brightness),
            motion: clamp_unit(motion),
            timestamp: Utc::now(),
        }
    }

    /// 분석 실패 시 반환하는 0 샘플 ("아직 정렬되지 않음")
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
