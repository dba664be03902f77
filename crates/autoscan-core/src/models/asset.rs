//! 저장 자산 모델.
//!
//! 스틸 이미지/영상이 영구 저장된 뒤 반환되는 참조와
//! 레코더가 만드는 영상 청크/객체를 정의.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::segment::SegmentId;

/// 저장 전략이 반환하는 위치 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAsset {
    /// 저장소 내부 위치 (예: 상대 경로, 오브젝트 키)
    pub location: String,
    /// 외부에서 접근 가능한 URI
    pub uri: String,
}

/// 세그먼트별 영구 저장 참조
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAssetReference {
    /// 세그먼트 ID
    pub segment_id: SegmentId,
    /// 저장소 내부 위치
    pub storage_location: String,
    /// 접근 URI
    pub uri: String,
}

impl StoredAssetReference {
    /// 저장 결과로부터 참조 생성
    pub fn new(segment_id: SegmentId, stored: StoredAsset) -> Self {
        Self {
            segment_id,
            storage_location: stored.location,
            uri: stored.uri,
        }
    }
}

/// 영상 업로드 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoLocation {
    /// 영상 URI
    pub uri: String,
}

/// 레코더가 고정 시간 단위로 받는 영상 조각
#[derive(Debug, Clone)]
pub struct VideoChunk {
    /// 청크 순번 (0부터)
    pub sequence: u32,
    /// 인코딩된 바이트
    pub bytes: Vec<u8>,
    /// 청크 시작 시각
    pub started_at: DateTime<Utc>,
}

/// 세션 종료 시 조립된 단일 영상 객체
#[derive(Debug, Clone)]
pub struct VideoObject {
    /// 연결된 영상 바이트
    pub bytes: Vec<u8>,
    /// MIME 타입 (예: "video/x-motion-jpeg")
    pub content_type: String,
    /// 녹화 길이 (밀리초)
    pub duration_ms: u64,
    /// 조립에 사용된 청크 수
    pub chunk_count: u32,
}

impl VideoObject {
    /// 청크 목록을 순서대로 연결하여 조립
    pub fn assemble(chunks: Vec<VideoChunk>, content_type: &str, duration_ms: u64) -> Self {
        let mut chunks = chunks;
        chunks.sort_by_key(|c| c.sequence);
        let chunk_count = chunks.len() as u32;
        let total: usize = chunks.iter().map(|c| c.bytes.len()).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(&chunk.bytes);
        }
        Self {
            bytes,
            content_type: content_type.to_string(),
            duration_ms,
            chunk_count,
        }
    }
}
