//! 제출 오케스트레이터.
//!
//! 모든 세그먼트가 끝난 뒤 실행된다.
//! 1. 자산 참조 완비 확인 (엔진이 재시도 간격을 관리)
//! 2. 녹화 정지 + 영상 업로드
//! 3. 점검 요청 조립 + 단일 제출
//!
//! 영상은 한 번만 업로드한다. 제출 재시도 시 업로드된 위치를 재사용한다.

use autoscan_core::error::CoreError;
use autoscan_core::models::asset::{VideoLocation, VideoObject};
use autoscan_core::models::segment::Segment;
use autoscan_core::models::session::CaptureSession;
use autoscan_core::models::submission::SubmissionReceipt;
use autoscan_core::ports::api_client::InspectionApi;
use autoscan_core::ports::storage::{CaptureJournal, VideoStore};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::CaptureError;
use crate::recorder::RecordingHandle;

/// 업로드 전 세션 영상
pub enum PendingVideo {
    /// 아직 녹화 중
    Recording(RecordingHandle),
    /// 조립 완료, 업로드 실패 후 대기
    Assembled(VideoObject),
}

/// 영상 업로드 실패 결과
pub struct VideoUploadFailure {
    /// 재시도용으로 보존된 영상 (조립 자체가 실패하면 `None`)
    pub video: Option<VideoObject>,
    /// 원인
    pub error: CaptureError,
}

/// 자산 준비 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    /// 저장된 세그먼트 수
    pub ready: usize,
    /// 전체 세그먼트 수
    pub total: usize,
}

impl Readiness {
    /// 세션의 자산 참조 완비 여부 확인
    pub fn check(session: &CaptureSession, segments: &[Segment]) -> Self {
        let ready = segments
            .iter()
            .filter(|s| session.asset(&s.id).is_some())
            .count();
        Self {
            ready,
            total: segments.len(),
        }
    }

    /// 모든 세그먼트가 준비되었는지
    pub fn is_complete(&self) -> bool {
        self.ready == self.total
    }

    /// 미완료 에러로 변환
    pub fn into_error(self) -> CaptureError {
        CaptureError::AssetsIncomplete {
            ready: self.ready,
            total: self.total,
        }
    }
}

/// 제출 오케스트레이터
pub struct SubmissionOrchestrator {
    video_store: Arc<dyn VideoStore>,
    api: Arc<dyn InspectionApi>,
    journal: Option<Arc<dyn CaptureJournal>>,
}

impl SubmissionOrchestrator {
    /// 새 오케스트레이터 생성
    pub fn new(
        video_store: Arc<dyn VideoStore>,
        api: Arc<dyn InspectionApi>,
        journal: Option<Arc<dyn CaptureJournal>>,
    ) -> Self {
        Self {
            video_store,
            api,
            journal,
        }
    }

    /// 녹화 정지(필요 시) 후 영상 업로드
    pub async fn upload_video(
        &self,
        session_id: &str,
        pending: PendingVideo,
    ) -> Result<VideoLocation, VideoUploadFailure> {
        let video = match pending {
            PendingVideo::Recording(handle) => {
                handle.stop().await.map_err(|error| VideoUploadFailure {
                    video: None,
                    error,
                })?
            }
            PendingVideo::Assembled(video) => video,
        };

        match self
            .video_store
            .upload_video(session_id, video.bytes.clone(), &video.content_type)
            .await
        {
            Ok(location) => {
                info!("세션 영상 업로드 완료: {}", location.uri);
                Ok(location)
            }
            Err(e) => {
                warn!("세션 영상 업로드 실패: {e}");
                Err(VideoUploadFailure {
                    video: Some(video),
                    error: CaptureError::Submission(e),
                })
            }
        }
    }

    /// 점검 요청 제출 (세션당 1회)
    pub async fn submit(
        &self,
        session: &CaptureSession,
        segments: &[Segment],
    ) -> Result<SubmissionReceipt, CaptureError> {
        if let Some(journal) = &self.journal {
            match journal.is_submitted(&session.session_id).await {
                Ok(true) => {
                    return Err(CaptureError::InvalidCommand(format!(
                        "세션 {} 이미 제출됨",
                        session.session_id
                    )))
                }
                Ok(false) => {}
                Err(e) => warn!("제출 이력 조회 실패: {e}"),
            }
        }

        let request = session.build_submission(segments).ok_or_else(|| {
            let readiness = Readiness::check(session, segments);
            if readiness.is_complete() {
                CaptureError::Submission(CoreError::Validation {
                    field: "video_uri".to_string(),
                    message: "세션 영상 위치 없음".to_string(),
                })
            } else {
                readiness.into_error()
            }
        })?;

        info!(
            "점검 제출: session={}, vehicle={}, images={}",
            session.session_id,
            request.vehicle_id,
            request.images.len()
        );
        let receipt = self
            .api
            .submit_inspection(&request)
            .await
            .map_err(CaptureError::Submission)?;

        if let Some(journal) = &self.journal {
            if let Err(e) = journal
                .record_submission(&session.session_id, &receipt)
                .await
            {
                warn!("제출 이력 기록 실패: {e}");
            }
        }
        Ok(receipt)
    }
}
