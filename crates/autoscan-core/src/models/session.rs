//! 캡처 세션 모델.
//!
//! 한 번의 촬영 시도 전체를 묶는 최상위 집합체.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::asset::{StoredAssetReference, VideoLocation};
use super::segment::{Segment, SegmentId};
use super::submission::{SubmissionImage, SubmissionRequest};

/// 캡처 세션
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSession {
    /// 세션 고유 ID
    pub session_id: String,
    /// 차량 식별자
    pub vehicle_id: String,
    /// 세션 시작 시각
    pub started_at: DateTime<Utc>,
    /// 활성 세그먼트 인덱스
    pub active_index: usize,
    /// 누적 영상 청크 수
    pub video_chunks: u32,
    /// 업로드된 세션 영상
    pub video: Option<VideoLocation>,
    /// 세그먼트 ID → 저장 참조 (삽입 전용)
    assets: BTreeMap<SegmentId, StoredAssetReference>,
}

impl CaptureSession {
    /// 새 세션 생성
    pub fn new(vehicle_id: impl Into<String>) -> Self {
        Self {
            session_id: generate_session_id(),
            vehicle_id: vehicle_id.into(),
            started_at: Utc::now(),
            active_index: 0,
            video_chunks: 0,
            video: None,
            assets: BTreeMap::new(),
        }
    }

    /// 녹화 경과 시간
    pub fn elapsed(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.started_at
    }

    /// 저장 참조 추가.
    ///
    /// 같은 세그먼트에 이미 참조가 있으면 덮어쓰지 않고 `false` 반환.
    pub fn insert_asset(&mut self, reference: StoredAssetReference) -> bool {
        match self.assets.entry(reference.segment_id.clone()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(reference);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// 세그먼트 저장 참조 조회
    pub fn asset(&self, segment_id: &SegmentId) -> Option<&StoredAssetReference> {
        self.assets.get(segment_id)
    }

    /// 저장 참조 수
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// 모든 세그먼트에 저장 참조가 있는지
    pub fn has_all_assets(&self, segments: &[Segment]) -> bool {
        self.assets.len() == segments.len()
            && segments.iter().all(|s| self.assets.contains_key(&s.id))
    }

    /// 세그먼트 순서대로 제출 요청 조립.
    ///
    /// 자산이 모자라거나 영상이 없으면 `None`.
    pub fn build_submission(&self, segments: &[Segment]) -> Option<SubmissionRequest> {
        if !self.has_all_assets(segments) {
            return None;
        }
        let video = self.video.as_ref()?;

        let mut ordered: Vec<&Segment> = segments.iter().collect();
        ordered.sort_by_key(|s| s.order);

        let images = ordered
            .into_iter()
            .filter_map(|s| self.assets.get(&s.id))
            .map(|r| SubmissionImage {
                segment_id: r.segment_id.clone(),
                uri: r.uri.clone(),
            })
            .collect();

        Some(SubmissionRequest {
            vehicle_id: self.vehicle_id.clone(),
            images,
            video_uri: video.uri.clone(),
        })
    }
}

/// 세션 ID 생성: 타임스탬프 + UUID 접두
fn generate_session_id() -> String {
    let ts = Utc::now().format("%Y%m%d%H%M%S");
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("scan_{ts}_{}", &uuid[..8])
}
