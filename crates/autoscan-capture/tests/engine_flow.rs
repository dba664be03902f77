//! 캡처 엔진 흐름 테스트 (가상 시간)

mod common;

use autoscan_capture::{CaptureError, RecoveryAction};
use autoscan_core::config::default_segments;
use autoscan_core::models::segment::{SegmentId, SegmentStatus};
use autoscan_core::models::submission::SessionPhase;
use common::Harness;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn segment_ids() -> Vec<String> {
    default_segments()
        .into_iter()
        .map(|d| d.id.to_string())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn full_session_submits_ordered_images_and_video() {
    let h = Harness::spawn();
    h.handle.start("VIN-0001").await.unwrap();

    let done = h.wait_for(|s| s.phase == SessionPhase::Done).await;
    assert_eq!(done.inspection_id.as_deref(), Some("insp_7"));
    assert_eq!(done.assets_stored, 10);
    assert!(done.error.is_none());

    // 세그먼트마다 정확히 한 번 저장
    for id in segment_ids() {
        assert_eq!(h.assets.calls_for(&id), 1, "segment {id}");
    }

    let requests = h.api.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.vehicle_id, "VIN-0001");
    let ids: Vec<String> = request
        .images
        .iter()
        .map(|i| i.segment_id.to_string())
        .collect();
    assert_eq!(ids, segment_ids());
    let session_id = done.session_id.clone().unwrap();
    assert!(request
        .images
        .iter()
        .all(|i| i.uri == format!("mem://{session_id}/{}.jpg", i.segment_id)));
    assert_eq!(request.video_uri, "mem://session.mjpeg");

    // 세션 전체가 하나의 영상으로 업로드
    assert_eq!(h.videos.uploads.load(Ordering::SeqCst), 1);
    assert!(!h.videos.bytes.lock().unwrap().is_empty());
    assert_eq!(h.video.starts.load(Ordering::SeqCst), 1);
    assert_eq!(h.video.stops.load(Ordering::SeqCst), 1);

    // 세그먼트 순서대로 분석, 세그먼트당 검증에 필요한 만큼만
    let scored = h.scored_ids();
    let mut order: Vec<String> = Vec::new();
    for id in &scored {
        if order.last() != Some(id) {
            order.push(id.clone());
        }
    }
    assert_eq!(order, segment_ids());
    assert_eq!(scored.len(), 10 * 12);
}

#[tokio::test(start_paused = true)]
async fn persistence_failure_blocks_until_retry() {
    let h = Harness::spawn();
    h.assets
        .fail_once
        .lock()
        .unwrap()
        .insert("right_rear_door".to_string());
    h.handle.start("VIN-0002").await.unwrap();

    let failed = h
        .wait_for(|s| s.segment_status("right_rear_door") == Some(SegmentStatus::Failed))
        .await;
    assert_eq!(failed.phase, SessionPhase::Recording);
    let error = failed.error.unwrap();
    assert_eq!(error.recovery, Some(RecoveryAction::RetrySegment));
    assert!(error.message.contains("right_rear_door"));
    assert_eq!(failed.assets_stored, 3);

    // 재시도 전까지 이후 세그먼트는 분석되지 않고 제출도 없음
    tokio::time::sleep(Duration::from_secs(60)).await;
    let later: Vec<String> = segment_ids()[4..].to_vec();
    assert!(h.scored_ids().iter().all(|id| !later.contains(id)));
    assert_eq!(h.api.request_count(), 0);
    let snapshot = h.handle.snapshot();
    assert_eq!(
        snapshot.segment_status("right_rear_quarter"),
        Some(SegmentStatus::Pending)
    );

    h.handle
        .retry_segment(SegmentId::new("right_rear_door"))
        .await
        .unwrap();
    let done = h.wait_for(|s| s.phase == SessionPhase::Done).await;
    assert_eq!(done.assets_stored, 10);

    assert_eq!(h.assets.calls_for("right_rear_door"), 2);
    assert_eq!(h.assets.calls_for("front"), 1);
    assert_eq!(h.assets.calls_for("left_front_fender"), 1);
    assert_eq!(h.api.request_count(), 1);
    assert_eq!(h.api.requests.lock().unwrap()[0].images.len(), 10);
}

#[tokio::test(start_paused = true)]
async fn submission_failure_retries_without_reupload() {
    let h = Harness::spawn();
    h.api.failures.store(1, Ordering::SeqCst);
    h.handle.start("VIN-0003").await.unwrap();

    let failed = h.wait_for(|s| s.phase == SessionPhase::Error).await;
    assert_eq!(
        failed.error.as_ref().and_then(|e| e.recovery),
        Some(RecoveryAction::RetrySubmission)
    );
    assert_eq!(h.api.request_count(), 1);
    assert_eq!(h.videos.uploads.load(Ordering::SeqCst), 1);

    h.handle.retry_submission().await.unwrap();
    let done = h.wait_for(|s| s.phase == SessionPhase::Done).await;
    assert_eq!(done.inspection_id.as_deref(), Some("insp_7"));
    assert_eq!(h.api.request_count(), 2);
    assert_eq!(h.videos.uploads.load(Ordering::SeqCst), 1);

    // 완료 후에는 재제출 불가
    let again = h.handle.retry_submission().await;
    assert!(matches!(again, Err(CaptureError::InvalidCommand(_))));
    assert_eq!(h.api.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn recorder_failure_requires_restart() {
    let h = Harness::spawn();
    *h.video.fail_from.lock().unwrap() = Some(3);
    h.handle.start("VIN-0004").await.unwrap();

    let failed = h.wait_for(|s| s.phase == SessionPhase::Error).await;
    assert_eq!(
        failed.error.as_ref().and_then(|e| e.recovery),
        Some(RecoveryAction::RestartSession)
    );
    let first_session = failed.session_id.clone().unwrap();
    assert!(matches!(
        h.handle.retry_submission().await,
        Err(CaptureError::InvalidCommand(_))
    ));

    *h.video.fail_from.lock().unwrap() = None;
    h.handle.start("VIN-0004").await.unwrap();
    let restarted = h.handle.snapshot();
    assert_eq!(restarted.phase, SessionPhase::Recording);
    assert!(restarted.error.is_none());
    assert_eq!(restarted.assets_stored, 0);
    assert_ne!(restarted.session_id.unwrap(), first_session);
}

#[tokio::test(start_paused = true)]
async fn frame_grab_failure_never_verifies() {
    let h = Harness::spawn();
    h.frames.broken.store(true, Ordering::SeqCst);
    h.handle.start("VIN-0005").await.unwrap();

    tokio::time::sleep(Duration::from_secs(30)).await;
    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::Recording);
    assert_eq!(snapshot.segment_status("front"), Some(SegmentStatus::Capturing));
    assert_eq!(snapshot.consecutive_passes, 0);
    assert_eq!(h.assets.calls_for("front"), 0);
    // 프레임이 없으면 스코어러까지 가지 않음
    assert!(h.scored_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn commands_are_validated_and_cancel_resets() {
    let h = Harness::spawn();
    assert!(matches!(
        h.handle.retry_submission().await,
        Err(CaptureError::InvalidCommand(_))
    ));
    assert!(matches!(
        h.handle.start("   ").await,
        Err(CaptureError::InvalidCommand(_))
    ));

    h.handle.start("VIN-0006").await.unwrap();
    assert!(matches!(
        h.handle.start("VIN-0007").await,
        Err(CaptureError::InvalidCommand(_))
    ));
    assert!(matches!(
        h.handle.retry_segment(SegmentId::new("front")).await,
        Err(CaptureError::InvalidCommand(_))
    ));

    tokio::time::sleep(Duration::from_secs(5)).await;
    h.handle.cancel().await.unwrap();
    let snapshot = h.handle.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::Idle);
    assert!(snapshot.session_id.is_none());
    assert!(snapshot.active.is_none());
    assert_eq!(h.video.stops.load(Ordering::SeqCst), 1);
    assert_eq!(h.api.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_persist_does_not_leak_into_next_session() {
    let h = Harness::spawn();
    h.assets
        .delay_once
        .lock()
        .unwrap()
        .insert("front".to_string(), Duration::from_secs(30));

    h.handle.start("VIN-0009").await.unwrap();
    let verifying = h
        .wait_for(|s| s.segment_status("front") == Some(SegmentStatus::Verifying))
        .await;
    let cancelled = verifying.session_id.clone().unwrap();

    // 저장이 진행 중인 상태에서 취소 후 새 세션 시작
    h.handle.cancel().await.unwrap();
    h.handle.start("VIN-0009").await.unwrap();
    let current = h.handle.snapshot().session_id.unwrap();
    assert_ne!(current, cancelled);

    let done = h.wait_for(|s| s.phase == SessionPhase::Done).await;
    assert_eq!(done.session_id.as_deref(), Some(current.as_str()));
    assert_eq!(done.assets_stored, 10);

    // 취소된 세션의 늦은 저장은 자기 세션 범위에만 기록됨
    let front_sessions = h.assets.sessions_written("front");
    assert_eq!(front_sessions.len(), 2);
    assert!(front_sessions.contains(&cancelled));
    assert!(front_sessions.contains(&current));

    // 새 세션의 제출에는 새 세션 자산만 포함
    let requests = h.api.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].images.len(), 10);
    assert!(requests[0]
        .images
        .iter()
        .all(|i| i.uri.starts_with(&format!("mem://{current}/"))));
}

#[tokio::test(start_paused = true)]
async fn engine_stops_when_handle_dropped() {
    let h = Harness::spawn();
    h.handle.start("VIN-0008").await.unwrap();
    let Harness { handle, task, video, .. } = h;
    drop(handle);
    tokio::time::timeout(Duration::from_secs(10), task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(video.stops.load(Ordering::SeqCst), 1);
}
