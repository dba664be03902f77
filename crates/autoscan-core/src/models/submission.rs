//! 제출 요청/응답 모델.

use serde::{Deserialize, Serialize};

use super::segment::SegmentId;

/// 세션 단위 진행 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// 시작 전
    #[default]
    Idle,
    /// 녹화 + 세그먼트 촬영 중
    Recording,
    /// 모든 세그먼트 완료, 자산 확인 + 영상 조립 중
    Assembling,
    /// 처리 서비스로 제출 중
    Submitting,
    /// 제출 완료
    Done,
    /// 종료 에러 (복구 동작 필요)
    Error,
}

impl SessionPhase {
    /// 더 이상 진행하지 않는 단계인지
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Done | SessionPhase::Error)
    }
}

/// 제출 요청 내 이미지 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionImage {
    /// 세그먼트 ID
    pub segment_id: SegmentId,
    /// 저장된 이미지 URI
    pub uri: String,
}

/// 처리 서비스로 보내는 점검 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// 차량 식별자
    pub vehicle_id: String,
    /// 세그먼트 순서대로 정렬된 이미지 목록
    pub images: Vec<SubmissionImage>,
    /// 세션 영상 URI
    pub video_uri: String,
}

/// 처리 서비스 응답
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    /// 서버가 발급한 점검 ID
    pub inspection_id: String,
    /// 처리 상태 (예: "queued")
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_format() {
        let request = SubmissionRequest {
            vehicle_id: "VIN123".to_string(),
            images: vec![SubmissionImage {
                segment_id: SegmentId::new("front"),
                uri: "https://cdn.example/front.jpg".to_string(),
            }],
            video_uri: "https://cdn.example/session.mjpeg".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["vehicle_id"], "VIN123");
        assert_eq!(json["images"][0]["segment_id"], "front");
        assert_eq!(json["video_uri"], "https://cdn.example/session.mjpeg");
    }

    #[test]
    fn terminal_phases() {
        assert!(SessionPhase::Done.is_terminal());
        assert!(SessionPhase::Error.is_terminal());
        assert!(!SessionPhase::Submitting.is_terminal());
        assert_eq!(SessionPhase::default(), SessionPhase::Idle);
    }
}
