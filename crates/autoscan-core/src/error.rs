//! AUTOSCAN 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 라이브러리 에러를 `CoreError` 변형으로 매핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 유효성 검증, 네트워크, 저장소, 미디어 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 인증 실패 (토큰 만료, 자격증명 오류 등)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Mask", "Asset")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// Rate Limit 초과 (429)
    #[error("요청 한도 초과, {retry_after_secs}초 후 재시도")]
    RateLimit {
        /// 재시도 대기 시간 (초)
        retry_after_secs: u64,
    },

    /// 서비스 일시 불가 (503)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),

    /// 카메라/레코더 장치 에러
    #[error("미디어 에러: {0}")]
    Media(String),

    /// 저장소 쓰기/읽기 실패
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 프레임 버퍼 디코딩 실패
    #[error("잘못된 프레임: {0}")]
    InvalidFrame(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 같은 요청을 다시 보내면 성공할 수 있는 에러인지 판별
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CoreError::Network(_) | CoreError::ServiceUnavailable(_) | CoreError::RateLimit { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(CoreError::Network("timeout".to_string()).is_transient());
        assert!(CoreError::RateLimit {
            retry_after_secs: 5
        }
        .is_transient());
        assert!(!CoreError::Storage("disk full".to_string()).is_transient());
        assert!(!CoreError::Auth("expired".to_string()).is_transient());
    }

    #[test]
    fn validation_message_contains_field() {
        let err = CoreError::Validation {
            field: "capture.min_score".to_string(),
            message: "0.0 ~ 1.0 범위여야 함".to_string(),
        };
        assert!(err.to_string().contains("capture.min_score"));
    }
}
