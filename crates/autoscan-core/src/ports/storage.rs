//! 저장소 포트.
//!
//! 구현: `autoscan-storage` (로컬 파일 + SQLite 저널), `autoscan-network` (원격 오브젝트 저장소)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::asset::{StoredAsset, StoredAssetReference, VideoLocation};
use crate::models::session::CaptureSession;
use crate::models::segment::SegmentId;
use crate::models::submission::SubmissionReceipt;

/// 스틸 이미지 저장 전략
///
/// 코어는 바이트가 어디에 저장되는지 알지 못한다.
/// 세션 ID는 호출마다 전달되며 구현은 세션 상태를 보관하지 않는다.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// 세그먼트 이미지를 영구 저장하고 위치 반환
    async fn persist(
        &self,
        session_id: &str,
        segment_id: &SegmentId,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredAsset, CoreError>;
}

/// 세션 영상 저장 전략
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// 조립된 영상 업로드
    async fn upload_video(
        &self,
        session_id: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<VideoLocation, CoreError>;
}

/// 캡처 세션 저널: 세션/자산/제출 결과의 영구 기록
#[async_trait]
pub trait CaptureJournal: Send + Sync {
    /// 세션 시작 기록
    async fn record_session(&self, session: &CaptureSession) -> Result<(), CoreError>;

    /// 세그먼트 저장 참조 기록
    async fn record_asset(
        &self,
        session_id: &str,
        reference: &StoredAssetReference,
    ) -> Result<(), CoreError>;

    /// 제출 성공 기록 (세션당 1회)
    async fn record_submission(
        &self,
        session_id: &str,
        receipt: &SubmissionReceipt,
    ) -> Result<(), CoreError>;

    /// 세션이 이미 제출되었는지
    async fn is_submitted(&self, session_id: &str) -> Result<bool, CoreError>;
}
