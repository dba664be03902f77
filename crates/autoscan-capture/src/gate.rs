//! 검증 게이트.
//!
//! 활성 세그먼트마다 연속 통과 카운터와 최근 점수 이력을 유지한다.
//! 필요한 연속 통과 수에 도달하면 정확히 한 번 `Verified`를 반환하고,
//! `reset()` 전까지 이후 샘플은 무시한다.

use autoscan_core::config::CaptureConfig;
use autoscan_core::models::sample::AlignmentSample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// 샘플 불합격 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// 점수 미달
    LowScore,
    /// 너무 어둡거나 밝음
    Brightness,
    /// 움직임 과다
    Motion,
    /// 최근 점수 편차 과다
    Unstable,
}

/// 샘플 평가 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// 통과 (누적 연속 통과 수)
    Pass {
        /// 현재 연속 통과 수
        consecutive: u32,
    },
    /// 불합격: 카운터 0으로 초기화
    Reject(RejectReason),
    /// 검증 완료 (세그먼트당 1회)
    Verified,
    /// 이미 검증됨, 샘플 무시
    Ignored,
}

/// 검증 게이트
#[derive(Debug, Clone)]
pub struct VerificationGate {
    min_score: f32,
    min_brightness: f32,
    max_brightness: f32,
    max_motion: f32,
    max_stddev: f32,
    required: u32,
    history_len: usize,
    consistency_min: usize,
    history: VecDeque<f32>,
    consecutive: u32,
    verified: bool,
}

impl VerificationGate {
    /// 설정값으로 게이트 생성
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            min_score: config.min_score,
            min_brightness: config.min_brightness,
            max_brightness: config.max_brightness,
            max_motion: config.max_motion,
            max_stddev: config.max_score_stddev,
            required: config.required_consecutive.max(1),
            history_len: config.history_len.max(1),
            consistency_min: config.consistency_min_samples,
            history: VecDeque::with_capacity(config.history_len.max(1)),
            consecutive: 0,
            verified: false,
        }
    }

    /// 샘플 평가
    pub fn evaluate(&mut self, sample: &AlignmentSample) -> GateDecision {
        if self.verified {
            return GateDecision::Ignored;
        }

        if self.history.len() == self.history_len {
            self.history.pop_front();
        }
        self.history.push_back(sample.score);

        if let Some(reason) = self.reject_reason(sample) {
            if self.consecutive > 0 {
                debug!("검증 카운터 초기화 ({:?}, 이전 {})", reason, self.consecutive);
            }
            self.consecutive = 0;
            return GateDecision::Reject(reason);
        }

        self.consecutive += 1;
        if self.consecutive >= self.required {
            self.verified = true;
            return GateDecision::Verified;
        }
        GateDecision::Pass {
            consecutive: self.consecutive,
        }
    }

    fn reject_reason(&self, sample: &AlignmentSample) -> Option<RejectReason> {
        if sample.score < self.min_score {
            return Some(RejectReason::LowScore);
        }
        if sample.brightness < self.min_brightness || sample.brightness > self.max_brightness {
            return Some(RejectReason::Brightness);
        }
        if sample.motion > self.max_motion {
            return Some(RejectReason::Motion);
        }
        match self.score_stddev() {
            Some(stddev) if stddev > self.max_stddev => Some(RejectReason::Unstable),
            _ => None,
        }
    }

    /// 최근 점수 표준편차 (이력이 최소 개수 미만이면 `None`)
    pub fn score_stddev(&self) -> Option<f32> {
        if self.history.len() < self.consistency_min.max(1) {
            return None;
        }
        let n = self.history.len() as f32;
        let mean = self.history.iter().sum::<f32>() / n;
        let variance = self.history.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n;
        Some(variance.sqrt())
    }

    /// 현재 연속 통과 수
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    /// 필요한 연속 통과 수
    pub fn required(&self) -> u32 {
        self.required
    }

    /// 검증 완료 여부
    pub fn is_verified(&self) -> bool {
        self.verified
    }

    /// 세그먼트 전환 시 초기화
    pub fn reset(&mut self) {
        self.history.clear();
        self.consecutive = 0;
        self.verified = false;
    }
}
