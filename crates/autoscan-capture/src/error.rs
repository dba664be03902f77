//! 캡처 파이프라인 에러.
//!
//! 표면화되는 모든 에러는 운영자가 취할 복구 동작을 함께 가진다.

use autoscan_core::error::CoreError;
use autoscan_core::models::segment::SegmentId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 운영자 복구 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    /// 실패한 세그먼트 재촬영
    RetrySegment,
    /// 세션 처음부터 다시 시작
    RestartSession,
    /// 제출만 다시 시도 (재촬영 없음)
    RetrySubmission,
}

/// 캡처 파이프라인 에러
#[derive(Debug, Error)]
pub enum CaptureError {
    /// 프레임 분석 실패: 0 샘플로 대체, UI에 노출하지 않음
    #[error("프레임 분석 실패: {0}")]
    Analysis(#[source] CoreError),

    /// 세그먼트 스틸 저장 실패
    #[error("세그먼트 {segment_id} 저장 실패: {source}")]
    Persistence {
        /// 실패한 세그먼트
        segment_id: SegmentId,
        /// 원인
        #[source]
        source: CoreError,
    },

    /// 카메라/레코더 장치 실패
    #[error("미디어 에러: {0}")]
    Media(#[source] CoreError),

    /// 영상 업로드 또는 점검 제출 실패
    #[error("제출 실패: {0}")]
    Submission(#[source] CoreError),

    /// 재확인 후에도 저장 참조가 모자람
    #[error("자산 준비 미완료: {ready}/{total}")]
    AssetsIncomplete {
        /// 저장된 세그먼트 수
        ready: usize,
        /// 전체 세그먼트 수
        total: usize,
    },

    /// 현재 상태에서 허용되지 않는 명령
    #[error("잘못된 명령: {0}")]
    InvalidCommand(String),
}

impl CaptureError {
    /// 운영자 복구 동작 (없으면 `None`)
    pub fn recovery(&self) -> Option<RecoveryAction> {
        match self {
            CaptureError::Persistence { .. } => Some(RecoveryAction::RetrySegment),
            CaptureError::Media(_) | CaptureError::AssetsIncomplete { .. } => {
                Some(RecoveryAction::RestartSession)
            }
            CaptureError::Submission(_) => Some(RecoveryAction::RetrySubmission),
            CaptureError::Analysis(_) | CaptureError::InvalidCommand(_) => None,
        }
    }
}

/// UI에 노출되는 에러 요약
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfacedError {
    /// 표시 메시지
    pub message: String,
    /// 복구 동작
    pub recovery: Option<RecoveryAction>,
}

impl From<&CaptureError> for SurfacedError {
    fn from(error: &CaptureError) -> Self {
        Self {
            message: error.to_string(),
            recovery: error.recovery(),
        }
    }
}
