//! 세그먼트 시퀀서.
//!
//! 세션 동안 세그먼트 목록과 활성 인덱스를 관리한다.
//! 활성 세그먼트(`Capturing`/`Verifying`)는 항상 최대 하나이며,
//! `Verified` 상태에서만 다음 세그먼트로 넘어간다.

use autoscan_core::models::segment::{Segment, SegmentDefinition, SegmentId, SegmentStatus};
use tracing::{debug, info};

use crate::error::CaptureError;

/// `advance()` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// 다음 세그먼트 활성화 (새 인덱스)
    Next(usize),
    /// 마지막 세그먼트까지 완료
    Complete,
}

/// 세그먼트 시퀀서
#[derive(Debug, Clone)]
pub struct SegmentSequencer {
    segments: Vec<Segment>,
    index: usize,
    started: bool,
}

impl SegmentSequencer {
    /// 정의 목록으로 시퀀서 생성 (모두 `Pending`)
    pub fn new(definitions: &[SegmentDefinition]) -> Self {
        Self {
            segments: definitions
                .iter()
                .enumerate()
                .map(|(order, def)| Segment::from_definition(def, order))
                .collect(),
            index: 0,
            started: false,
        }
    }

    /// 세션 시작: 전체 초기화 후 첫 세그먼트 활성화
    pub fn start(&mut self) {
        for segment in &mut self.segments {
            segment.status = SegmentStatus::Pending;
        }
        self.index = 0;
        self.started = true;
        if let Some(first) = self.segments.first_mut() {
            first.status = SegmentStatus::Capturing;
            info!("세그먼트 시작: {} ({})", first.id, first.label);
        }
    }

    /// 세션 종료 후 대기 상태로 되돌림
    pub fn stop(&mut self) {
        for segment in &mut self.segments {
            segment.status = SegmentStatus::Pending;
        }
        self.index = 0;
        self.started = false;
    }

    /// 현재 세그먼트 (완료 후 또는 시작 전이면 `None`)
    pub fn current(&self) -> Option<&Segment> {
        if !self.started {
            return None;
        }
        self.segments.get(self.index)
    }

    /// 현재 인덱스
    pub fn current_index(&self) -> usize {
        self.index
    }

    /// 전체 세그먼트
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// 전체 세그먼트 수
    pub fn total(&self) -> usize {
        self.segments.len()
    }

    /// 모든 세그먼트 검증 완료 여부
    pub fn is_complete(&self) -> bool {
        self.started && self.index >= self.segments.len()
    }

    /// `Capturing` → `Verifying` (검증 통과, 저장 진행)
    pub fn mark_verifying(&mut self) -> Result<(), CaptureError> {
        self.transition(SegmentStatus::Capturing, SegmentStatus::Verifying)
    }

    /// `Verifying` → `Verified` (저장 성공)
    pub fn mark_verified(&mut self) -> Result<(), CaptureError> {
        self.transition(SegmentStatus::Verifying, SegmentStatus::Verified)
    }

    /// `Verifying` → `Failed` (저장 실패)
    pub fn mark_failed(&mut self) -> Result<(), CaptureError> {
        self.transition(SegmentStatus::Verifying, SegmentStatus::Failed)
    }

    fn transition(&mut self, from: SegmentStatus, to: SegmentStatus) -> Result<(), CaptureError> {
        if !self.started {
            return Err(CaptureError::InvalidCommand("활성 세그먼트 없음".to_string()));
        }
        let segment = self
            .segments
            .get_mut(self.index)
            .ok_or_else(|| CaptureError::InvalidCommand("활성 세그먼트 없음".to_string()))?;

        if segment.status != from {
            return Err(CaptureError::InvalidCommand(format!(
                "세그먼트 {} 상태 {:?}에서 {:?}로 전환 불가",
                segment.id, segment.status, to
            )));
        }
        debug!("세그먼트 {} {:?} → {:?}", segment.id, from, to);
        segment.status = to;
        Ok(())
    }

    /// 다음 세그먼트로 이동. 현재 세그먼트가 `Verified`여야 한다.
    pub fn advance(&mut self) -> Result<Advance, CaptureError> {
        match self.current() {
            Some(segment) if segment.status == SegmentStatus::Verified => {}
            Some(segment) => {
                return Err(CaptureError::InvalidCommand(format!(
                    "세그먼트 {} 미검증 상태({:?})에서 이동 불가",
                    segment.id, segment.status
                )))
            }
            None => return Err(CaptureError::InvalidCommand("활성 세그먼트 없음".to_string())),
        }

        self.index += 1;
        let total = self.segments.len();
        match self.segments.get_mut(self.index) {
            Some(next) => {
                next.status = SegmentStatus::Capturing;
                info!(
                    "세그먼트 이동 ({}/{}): {} ({})",
                    self.index + 1,
                    total,
                    next.id,
                    next.label
                );
                Ok(Advance::Next(self.index))
            }
            None => {
                info!("모든 세그먼트 검증 완료 ({total}개)");
                Ok(Advance::Complete)
            }
        }
    }

    /// 실패한 세그먼트를 다시 활성화
    pub fn retry(&mut self, segment_id: &SegmentId) -> Result<(), CaptureError> {
        let Some(position) = self.segments.iter().position(|s| &s.id == segment_id) else {
            return Err(CaptureError::InvalidCommand(format!(
                "알 수 없는 세그먼트: {segment_id}"
            )));
        };
        let segment = &mut self.segments[position];
        if !self.started || segment.status != SegmentStatus::Failed {
            return Err(CaptureError::InvalidCommand(format!(
                "세그먼트 {} 상태 {:?}는 재시도 불가",
                segment.id, segment.status
            )));
        }

        segment.status = SegmentStatus::Capturing;
        self.index = position;
        info!("세그먼트 재시도: {}", segment.id);
        Ok(())
    }
}
