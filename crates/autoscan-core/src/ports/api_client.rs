//! 처리 서비스 API 포트.
//!
//! 구현: `autoscan-network` crate (reqwest)

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::submission::{SubmissionReceipt, SubmissionRequest};

/// 원격 점검 처리 서비스
#[async_trait]
pub trait InspectionApi: Send + Sync {
    /// 점검 요청 제출.
    ///
    /// 네트워크/타임아웃 실패는 재캡처 없이 제출만 다시 호출하여 복구한다.
    async fn submit_inspection(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, CoreError>;
}
