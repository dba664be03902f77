//! 세그먼트(촬영 지점) 모델.
//!
//! 차량 한 대를 열 개의 고정된 순서의 촬영 지점으로 나눈다.
//! 각 세그먼트는 관심 영역 마스크와 진행 상태를 가진다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 세그먼트 식별자 (예: "front", "right_front_door")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(String);

impl SegmentId {
    /// 새 식별자 생성
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 문자열 참조
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SegmentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// 세그먼트 진행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    /// 아직 차례가 오지 않음
    Pending,
    /// 활성: 정렬 분석 중
    Capturing,
    /// 검증 완료, 스틸 이미지 저장 중
    Verifying,
    /// 저장까지 완료
    Verified,
    /// 저장 실패 (재시도 필요)
    Failed,
}

impl SegmentStatus {
    /// 분석/저장이 진행 중인 활성 상태인지
    pub fn is_active(self) -> bool {
        matches!(self, SegmentStatus::Capturing | SegmentStatus::Verifying)
    }
}

/// 관심 영역 마스크 정의
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaskSpec {
    /// 정규화 좌표 (0.0 ~ 1.0) 다각형: 작업 해상도에서 안티앨리어싱 래스터화
    Polygon {
        /// 꼭짓점 목록 `[x, y]`
        points: Vec<[f32; 2]>,
    },
    /// 알파(또는 그레이스케일) 마스크 이미지 파일
    Image {
        /// 마스크 이미지 경로
        path: PathBuf,
    },
}

/// 설정 파일에 기술되는 세그먼트 정의
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDefinition {
    /// 안정 식별자
    pub id: SegmentId,
    /// 표시 이름
    pub label: String,
    /// 촬영자 안내 문구
    pub instruction: String,
    /// 관심 영역 마스크
    pub mask: MaskSpec,
}

/// 세션 동안 유지되는 세그먼트 (정의 + 순서 + 상태)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// 안정 식별자
    pub id: SegmentId,
    /// 표시 이름
    pub label: String,
    /// 촬영자 안내 문구
    pub instruction: String,
    /// 촬영 순서 (0부터)
    pub order: usize,
    /// 관심 영역 마스크
    pub mask: MaskSpec,
    /// 진행 상태
    pub status: SegmentStatus,
}

impl Segment {
    /// 설정 정의에서 세그먼트 생성 (상태는 `Pending`)
    pub fn from_definition(definition: &SegmentDefinition, order: usize) -> Self {
        Self {
            id: definition.id.clone(),
            label: definition.label.clone(),
            instruction: definition.instruction.clone(),
            order,
            mask: definition.mask.clone(),
            status: SegmentStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_spec_tagged_serde() {
        let mask = MaskSpec::Polygon {
            points: vec![[0.1, 0.2], [0.9, 0.2], [0.5, 0.8]],
        };
        let json = serde_json::to_value(&mask).unwrap();
        assert_eq!(json["kind"], "polygon");

        let image: MaskSpec =
            serde_json::from_str(r#"{"kind":"image","path":"masks/front.png"}"#).unwrap();
        assert_eq!(
            image,
            MaskSpec::Image {
                path: PathBuf::from("masks/front.png")
            }
        );
    }

    #[test]
    fn from_definition_starts_pending() {
        let def = SegmentDefinition {
            id: SegmentId::new("rear"),
            label: "Rear".to_string(),
            instruction: "차량 뒤쪽 정면에 서세요".to_string(),
            mask: MaskSpec::Polygon { points: vec![] },
        };
        let segment = Segment::from_definition(&def, 5);
        assert_eq!(segment.order, 5);
        assert_eq!(segment.status, SegmentStatus::Pending);
        assert!(!segment.status.is_active());
    }
}
