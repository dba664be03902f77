//! 카메라/레코더 포트.
//!
//! 구현: `autoscan-app` (프레임 리플레이 카메라), 테스트 스텁

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::frame::CameraFrame;

/// 라이브 카메라 프레임 공급자
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// 현재 카메라 프레임 반환
    async fn current_frame(&self) -> Result<CameraFrame, CoreError>;
}

/// 연속 영상 공급자: 세션 레코더가 고정 시간 단위로 청크를 읽는다
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// 녹화 시작
    async fn start(&self) -> Result<(), CoreError>;

    /// 마지막 호출 이후 누적된 인코딩 바이트 반환
    async fn read_chunk(&self) -> Result<Vec<u8>, CoreError>;

    /// 녹화 중지
    async fn stop(&self) -> Result<(), CoreError>;

    /// 영상 MIME 타입
    fn content_type(&self) -> &str;
}
