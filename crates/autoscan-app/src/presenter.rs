//! 상태 표시.
//!
//! `EngineSnapshot` 변화를 관찰해 단계 전환, 세그먼트 안내, 검증 진행,
//! 에러와 복구 동작을 로그로 출력한다. 엔진 상태는 읽기만 한다.

use autoscan_capture::error::RecoveryAction;
use autoscan_capture::EngineSnapshot;
use autoscan_core::models::segment::{SegmentId, SegmentStatus};
use autoscan_core::models::submission::SessionPhase;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 스냅샷 차이를 사람이 읽을 문장으로 바꾸는 표시기
#[derive(Debug, Default)]
pub struct StatusPresenter {
    phase: Option<SessionPhase>,
    segment: Option<(SegmentId, SegmentStatus)>,
    passes: u32,
    error: Option<String>,
}

impl StatusPresenter {
    /// 새 표시기
    pub fn new() -> Self {
        Self::default()
    }

    /// 이전 스냅샷 대비 변화 목록
    pub fn observe(&mut self, snapshot: &EngineSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        if self.phase != Some(snapshot.phase) {
            self.phase = Some(snapshot.phase);
            lines.push(match snapshot.phase {
                SessionPhase::Idle => "대기 중".to_string(),
                SessionPhase::Recording => format!(
                    "촬영 시작: 차량 {}",
                    snapshot.vehicle_id.as_deref().unwrap_or("-")
                ),
                SessionPhase::Assembling => "모든 지점 촬영 완료, 영상 조립 중".to_string(),
                SessionPhase::Submitting => "점검 요청 제출 중".to_string(),
                SessionPhase::Done => format!(
                    "제출 완료: inspection_id={}",
                    snapshot.inspection_id.as_deref().unwrap_or("-")
                ),
                SessionPhase::Error => "세션 에러".to_string(),
            });
        }

        let current = snapshot
            .active
            .as_ref()
            .map(|a| (a.id.clone(), a.status));
        if current != self.segment {
            if let Some(active) = &snapshot.active {
                match active.status {
                    SegmentStatus::Capturing => lines.push(format!(
                        "[{}/{}] {}: {}",
                        active.index + 1,
                        active.total,
                        active.label,
                        active.instruction
                    )),
                    SegmentStatus::Verifying => {
                        lines.push(format!("{} 정렬 확인, 저장 중", active.label))
                    }
                    SegmentStatus::Verified => lines.push(format!("{} 저장 완료", active.label)),
                    SegmentStatus::Failed => lines.push(format!("{} 저장 실패", active.label)),
                    SegmentStatus::Pending => {}
                }
            }
            self.segment = current;
            self.passes = 0;
        }

        if snapshot.consecutive_passes != self.passes {
            self.passes = snapshot.consecutive_passes;
            if let Some(sample) = &snapshot.latest_sample {
                debug!(
                    "정렬 {}/{} (score {:.2}, 밝기 {:.2}, 움직임 {:.2})",
                    snapshot.consecutive_passes,
                    snapshot.required_passes,
                    sample.score,
                    sample.brightness,
                    sample.motion
                );
            }
        }

        let message = snapshot.error.as_ref().map(|e| e.message.clone());
        if message != self.error {
            if let Some(error) = &snapshot.error {
                lines.push(format!(
                    "에러: {} → {}",
                    error.message,
                    recovery_hint(error.recovery)
                ));
            }
            self.error = message;
        }

        lines
    }
}

fn recovery_hint(action: Option<RecoveryAction>) -> &'static str {
    match action {
        Some(RecoveryAction::RetrySegment) => "같은 지점을 다시 촬영하세요",
        Some(RecoveryAction::RestartSession) => "세션을 처음부터 다시 시작하세요",
        Some(RecoveryAction::RetrySubmission) => "제출을 다시 시도하세요",
        None => "조치 없음",
    }
}

/// 스냅샷 채널을 관찰하며 로그 출력 (채널 종료 또는 종료 신호까지)
pub async fn run_presenter(
    mut snapshots: watch::Receiver<EngineSnapshot>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut presenter = StatusPresenter::new();
    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        for line in presenter.observe(&snapshot) {
            if snapshot.error.is_some() && line.starts_with("에러") {
                warn!("{line}");
            } else {
                info!("{line}");
            }
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    debug!("스냅샷 채널 종료, 표시 중지");
                    break;
                }
            }
            _ = shutdown_rx.changed() => {
                debug!("종료 신호 수신, 표시 중지");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoscan_capture::engine::ActiveSegment;
    use autoscan_capture::error::SurfacedError;

    fn recording(status: SegmentStatus, passes: u32) -> EngineSnapshot {
        EngineSnapshot {
            phase: SessionPhase::Recording,
            vehicle_id: Some("VIN1".to_string()),
            active: Some(ActiveSegment {
                index: 0,
                total: 10,
                id: SegmentId::new("front"),
                label: "Front".to_string(),
                instruction: "차량 정면에 서세요".to_string(),
                status,
            }),
            consecutive_passes: passes,
            required_passes: 12,
            ..Default::default()
        }
    }

    #[test]
    fn reports_phase_and_segment_once() {
        let mut presenter = StatusPresenter::new();
        let lines = presenter.observe(&recording(SegmentStatus::Capturing, 0));
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("VIN1"));
        assert!(lines[1].starts_with("[1/10] Front"));

        // 통과 수만 바뀌면 출력 없음
        assert!(presenter
            .observe(&recording(SegmentStatus::Capturing, 5))
            .is_empty());

        let lines = presenter.observe(&recording(SegmentStatus::Verifying, 12));
        assert_eq!(lines, vec!["Front 정렬 확인, 저장 중".to_string()]);
    }

    #[test]
    fn reports_error_with_recovery_hint() {
        let mut presenter = StatusPresenter::new();
        presenter.observe(&recording(SegmentStatus::Capturing, 0));

        let mut failed = recording(SegmentStatus::Failed, 0);
        failed.error = Some(SurfacedError {
            message: "세그먼트 front 저장 실패: disk full".to_string(),
            recovery: Some(RecoveryAction::RetrySegment),
        });
        let lines = presenter.observe(&failed);
        assert!(lines.iter().any(|l| l == "Front 저장 실패"));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("에러") && l.contains("다시 촬영")));

        // 같은 에러는 반복 출력하지 않음
        assert!(presenter.observe(&failed).is_empty());
    }

    #[test]
    fn reports_done_with_inspection_id() {
        let mut presenter = StatusPresenter::new();
        let done = EngineSnapshot {
            phase: SessionPhase::Done,
            inspection_id: Some("insp_9".to_string()),
            ..Default::default()
        };
        assert_eq!(
            presenter.observe(&done),
            vec!["제출 완료: inspection_id=insp_9".to_string()]
        );
    }

    #[tokio::test]
    async fn presenter_stops_on_shutdown() {
        let (_snap_tx, snap_rx) = watch::channel(EngineSnapshot::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_presenter(snap_rx, shutdown_rx));
        shutdown_tx.send_replace(true);
        task.await.unwrap();
    }
}
