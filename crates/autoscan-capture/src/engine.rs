//! 캡처 엔진.
//!
//! 세션 상태를 단독 소유하는 단일 이벤트 루프.
//! 분석 틱, 저장 완료, 안정화 타이머, 자산 확인 타이머, 업로드/제출 완료,
//! 레코더 실패, 운영자 명령을 하나의 `tokio::select!`로 처리한다.
//!
//! - 분석은 동시에 최대 하나 (스코어러 소유권을 작업에 넘겼다가 돌려받음)
//! - 백그라운드 작업 결과는 세션 epoch가 다르면 폐기
//! - 상태가 바뀔 때마다 `watch` 채널로 스냅샷 발행

use autoscan_core::config::{AppConfig, CaptureConfig, StillFormat};
use autoscan_core::error::CoreError;
use autoscan_core::models::asset::{StoredAsset, StoredAssetReference, VideoLocation, VideoObject};
use autoscan_core::models::frame::CameraFrame;
use autoscan_core::models::sample::AlignmentSample;
use autoscan_core::models::segment::{Segment, SegmentId, SegmentStatus};
use autoscan_core::models::session::CaptureSession;
use autoscan_core::models::submission::{SessionPhase, SubmissionReceipt};
use autoscan_core::ports::api_client::InspectionApi;
use autoscan_core::ports::camera::{FrameSource, VideoSource};
use autoscan_core::ports::storage::{AssetStore, CaptureJournal, VideoStore};
use autoscan_core::ports::vision::FrameScorer;
use autoscan_vision::encoder::encode_still;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::{CaptureError, RecoveryAction, SurfacedError};
use crate::gate::{GateDecision, VerificationGate};
use crate::recorder::{RecordingHandle, SessionRecorder};
use crate::sequencer::{Advance, SegmentSequencer};
use crate::submission::{PendingVideo, Readiness, SubmissionOrchestrator, VideoUploadFailure};

/// 명령 채널 버퍼
const COMMAND_BUFFER: usize = 16;

type Reply = oneshot::Sender<Result<(), CaptureError>>;

/// 운영자 명령
#[derive(Debug)]
pub enum EngineCommand {
    /// 새 세션 시작 (Idle/Done/Error에서만)
    Start {
        /// 차량 식별자
        vehicle_id: String,
        /// 응답
        reply: Reply,
    },
    /// 실패한 세그먼트 재촬영
    RetrySegment {
        /// 대상 세그먼트
        segment_id: SegmentId,
        /// 응답
        reply: Reply,
    },
    /// 제출 재시도 (영상 재업로드 없음)
    RetrySubmission {
        /// 응답
        reply: Reply,
    },
    /// 세션 취소
    Cancel {
        /// 응답
        reply: Reply,
    },
}

/// 활성 세그먼트 표시 정보
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSegment {
    /// 0부터 시작하는 순서
    pub index: usize,
    /// 전체 세그먼트 수
    pub total: usize,
    /// 세그먼트 ID
    pub id: SegmentId,
    /// 표시 이름
    pub label: String,
    /// 안내 문구
    pub instruction: String,
    /// 상태
    pub status: SegmentStatus,
}

/// 세그먼트 진행 상태
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentProgress {
    /// 세그먼트 ID
    pub id: SegmentId,
    /// 상태
    pub status: SegmentStatus,
}

/// 프레젠테이션 계층용 엔진 상태 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub phase: SessionPhase,
    pub session_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub active: Option<ActiveSegment>,
    pub segments: Vec<SegmentProgress>,
    pub latest_sample: Option<AlignmentSample>,
    pub consecutive_passes: u32,
    pub required_passes: u32,
    pub assets_stored: usize,
    pub video_chunks: u32,
    pub inspection_id: Option<String>,
    pub error: Option<SurfacedError>,
}

impl EngineSnapshot {
    /// 세그먼트 상태 조회
    pub fn segment_status(&self, id: &str) -> Option<SegmentStatus> {
        self.segments
            .iter()
            .find(|s| s.id.as_str() == id)
            .map(|s| s.status)
    }
}

/// 엔진 외부 의존성
pub struct EnginePorts {
    pub frames: Arc<dyn FrameSource>,
    pub video: Arc<dyn VideoSource>,
    pub asset_store: Arc<dyn AssetStore>,
    pub video_store: Arc<dyn VideoStore>,
    pub inspection_api: Arc<dyn InspectionApi>,
    pub journal: Option<Arc<dyn CaptureJournal>>,
    pub scorer: Box<dyn FrameScorer>,
}

/// 백그라운드 작업 완료 이벤트
enum EngineEvent {
    Analyzed {
        epoch: u64,
        index: usize,
        scorer: Box<dyn FrameScorer>,
        sample: AlignmentSample,
    },
    Persisted {
        epoch: u64,
        segment_id: SegmentId,
        result: Result<StoredAsset, CoreError>,
    },
    VideoUploaded {
        epoch: u64,
        result: Result<VideoLocation, VideoUploadFailure>,
    },
    Submitted {
        epoch: u64,
        result: Result<SubmissionReceipt, CaptureError>,
    },
}

/// 검증 후 다음 세그먼트 이동 조건 (안정화 대기 + 저장 성공)
struct Settle {
    deadline: Option<Instant>,
    persisted: bool,
}

/// 자산 준비 재확인 상태
struct ReadinessCheck {
    attempts: u32,
    next_check: Instant,
}

/// 엔진 제어 핸들
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
    snapshots: watch::Receiver<EngineSnapshot>,
}

impl EngineHandle {
    /// 세션 시작
    pub async fn start(&self, vehicle_id: impl Into<String>) -> Result<(), CaptureError> {
        let vehicle_id = vehicle_id.into();
        self.request(|reply| EngineCommand::Start { vehicle_id, reply })
            .await
    }

    /// 실패한 세그먼트 재시도
    pub async fn retry_segment(&self, segment_id: SegmentId) -> Result<(), CaptureError> {
        self.request(|reply| EngineCommand::RetrySegment { segment_id, reply })
            .await
    }

    /// 제출 재시도
    pub async fn retry_submission(&self) -> Result<(), CaptureError> {
        self.request(|reply| EngineCommand::RetrySubmission { reply })
            .await
    }

    /// 세션 취소
    pub async fn cancel(&self) -> Result<(), CaptureError> {
        self.request(|reply| EngineCommand::Cancel { reply }).await
    }

    /// 최신 스냅샷
    pub fn snapshot(&self) -> EngineSnapshot {
        self.snapshots.borrow().clone()
    }

    /// 스냅샷 구독
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshots.clone()
    }

    async fn request(
        &self,
        command: impl FnOnce(Reply) -> EngineCommand,
    ) -> Result<(), CaptureError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| CaptureError::InvalidCommand("캡처 엔진 종료됨".to_string()))?;
        rx.await
            .map_err(|_| CaptureError::InvalidCommand("캡처 엔진 응답 없음".to_string()))?
    }
}

/// 캡처 엔진
pub struct CaptureEngine {
    capture: CaptureConfig,
    still_format: StillFormat,
    still_quality: u8,

    sequencer: SegmentSequencer,
    gate: VerificationGate,
    scorer: Option<Box<dyn FrameScorer>>,
    scorer_stale: bool,

    frames: Arc<dyn FrameSource>,
    asset_store: Arc<dyn AssetStore>,
    journal: Option<Arc<dyn CaptureJournal>>,
    recorder: SessionRecorder,
    orchestrator: Arc<SubmissionOrchestrator>,

    commands: mpsc::Receiver<EngineCommand>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    snapshot_tx: watch::Sender<EngineSnapshot>,

    // 세션 상태
    epoch: u64,
    phase: SessionPhase,
    session: Option<CaptureSession>,
    recording: Option<RecordingHandle>,
    pending_video: Option<VideoObject>,
    analysis_after: Option<Instant>,
    settle: Option<Settle>,
    readiness: Option<ReadinessCheck>,
    latest_sample: Option<AlignmentSample>,
    inspection_id: Option<String>,
    error: Option<SurfacedError>,
    submitted: bool,
}

impl CaptureEngine {
    /// 엔진 생성 (실행은 `run()`)
    pub fn new(config: &AppConfig, ports: EnginePorts) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::default());

        let engine = Self {
            capture: config.capture.clone(),
            still_format: config.vision.still_format,
            still_quality: config.vision.still_quality,
            sequencer: SegmentSequencer::new(&config.segments),
            gate: VerificationGate::new(&config.capture),
            scorer: Some(ports.scorer),
            scorer_stale: false,
            frames: ports.frames,
            asset_store: ports.asset_store,
            journal: ports.journal.clone(),
            recorder: SessionRecorder::new(ports.video, config.recorder.chunk_interval()),
            orchestrator: Arc::new(SubmissionOrchestrator::new(
                ports.video_store,
                ports.inspection_api,
                ports.journal,
            )),
            commands: command_rx,
            events_tx,
            events_rx,
            snapshot_tx,
            epoch: 0,
            phase: SessionPhase::Idle,
            session: None,
            recording: None,
            pending_video: None,
            analysis_after: None,
            settle: None,
            readiness: None,
            latest_sample: None,
            inspection_id: None,
            error: None,
            submitted: false,
        };
        engine.publish();

        let handle = EngineHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        };
        (engine, handle)
    }

    /// 이벤트 루프 실행 (명령 채널이 닫히면 종료)
    pub async fn run(mut self) {
        let interval = self.capture.sample_interval();
        info!(
            "캡처 엔진 시작: 세그먼트 {}개, 분석 간격 {:?}",
            self.sequencer.total(),
            interval
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let settle_at = self.settle.as_ref().and_then(|s| s.deadline);
            let readiness_at = self.readiness.as_ref().map(|r| r.next_check);

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        info!("명령 채널 종료, 캡처 엔진 정지");
                        break;
                    }
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event).await,
                _ = ticker.tick() => self.on_tick(),
                _ = sleep_until_opt(settle_at) => self.on_settled(),
                _ = sleep_until_opt(readiness_at) => self.check_readiness(),
                failure = wait_recording_failure(&mut self.recording) => {
                    self.recording = None;
                    error!("세션 녹화 실패: {failure}");
                    self.fail(&CaptureError::Media(failure));
                }
            }
        }

        self.reset_session().await;
        self.publish();
        info!("캡처 엔진 종료");
    }

    // ============================================================
    // 명령
    // ============================================================

    async fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Start { vehicle_id, reply } => {
                let result = self.start_session(vehicle_id).await;
                respond(reply, result);
            }
            EngineCommand::RetrySegment { segment_id, reply } => {
                let result = self.retry_segment(&segment_id);
                respond(reply, result);
            }
            EngineCommand::RetrySubmission { reply } => {
                let result = self.retry_submission();
                respond(reply, result);
            }
            EngineCommand::Cancel { reply } => {
                if self.phase != SessionPhase::Idle {
                    info!("세션 취소 요청");
                }
                self.reset_session().await;
                self.publish();
                respond(reply, Ok(()));
            }
        }
    }

    async fn start_session(&mut self, vehicle_id: String) -> Result<(), CaptureError> {
        if matches!(
            self.phase,
            SessionPhase::Recording | SessionPhase::Assembling | SessionPhase::Submitting
        ) {
            return Err(CaptureError::InvalidCommand(format!(
                "세션 진행 중 ({:?})",
                self.phase
            )));
        }
        let vehicle_id = vehicle_id.trim().to_string();
        if vehicle_id.is_empty() {
            return Err(CaptureError::InvalidCommand("차량 ID 없음".to_string()));
        }

        self.reset_session().await;
        let session = CaptureSession::new(vehicle_id);
        info!(
            "캡처 세션 시작: {} (차량 {})",
            session.session_id, session.vehicle_id
        );

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.record_session(&session).await {
                warn!("세션 이력 기록 실패: {e}");
            }
        }

        let recording = match self.recorder.start().await {
            Ok(handle) => handle,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };

        self.session = Some(session);
        self.recording = Some(recording);
        self.phase = SessionPhase::Recording;
        self.sequencer.start();
        self.enter_segment();
        self.publish();
        Ok(())
    }

    fn retry_segment(&mut self, segment_id: &SegmentId) -> Result<(), CaptureError> {
        if self.phase != SessionPhase::Recording {
            return Err(CaptureError::InvalidCommand(format!(
                "세그먼트 재시도 불가 ({:?})",
                self.phase
            )));
        }
        self.sequencer.retry(segment_id)?;
        self.error = None;
        self.enter_segment();
        self.publish();
        Ok(())
    }

    fn retry_submission(&mut self) -> Result<(), CaptureError> {
        let retryable = self.phase == SessionPhase::Error
            && !self.submitted
            && self.error.as_ref().and_then(|e| e.recovery) == Some(RecoveryAction::RetrySubmission);
        if !retryable {
            return Err(CaptureError::InvalidCommand(format!(
                "제출 재시도 불가 ({:?})",
                self.phase
            )));
        }

        info!("제출 재시도");
        self.error = None;
        let uploaded = self.session.as_ref().is_some_and(|s| s.video.is_some());
        if uploaded {
            self.begin_submission();
        } else {
            self.begin_video_upload();
        }
        Ok(())
    }

    /// 진행 중인 세션 정리 후 Idle로 복귀
    async fn reset_session(&mut self) {
        self.epoch += 1;
        if let Some(handle) = self.recording.take() {
            handle.cancel().await;
        }
        self.session = None;
        self.pending_video = None;
        self.analysis_after = None;
        self.settle = None;
        self.readiness = None;
        self.latest_sample = None;
        self.inspection_id = None;
        self.error = None;
        self.submitted = false;
        self.gate.reset();
        self.scorer_stale = true;
        self.sequencer.stop();
        self.phase = SessionPhase::Idle;
    }

    // ============================================================
    // 분석
    // ============================================================

    fn on_tick(&mut self) {
        if self.phase != SessionPhase::Recording {
            return;
        }
        let segment = match self.sequencer.current() {
            Some(segment) if segment.status == SegmentStatus::Capturing => segment.clone(),
            _ => return,
        };
        if self.analysis_after.is_some_and(|after| Instant::now() < after) {
            return;
        }
        let Some(mut scorer) = self.scorer.take() else {
            debug!("이전 분석 진행 중, 틱 건너뜀");
            return;
        };
        if std::mem::take(&mut self.scorer_stale) {
            scorer.reset();
        }

        let frames = self.frames.clone();
        let events = self.events_tx.clone();
        let epoch = self.epoch;
        let index = self.sequencer.current_index();

        tokio::spawn(async move {
            let frame = frames.current_frame().await;
            let scored = tokio::task::spawn_blocking(move || {
                let sample = match frame {
                    Ok(frame) => score_guarded(scorer.as_mut(), &frame, &segment),
                    Err(e) => {
                        warn!("{}, 0 샘플 사용", CaptureError::Analysis(e));
                        AlignmentSample::zero()
                    }
                };
                (scorer, sample)
            })
            .await;

            match scored {
                Ok((scorer, sample)) => {
                    let _ = events.send(EngineEvent::Analyzed {
                        epoch,
                        index,
                        scorer,
                        sample,
                    });
                }
                Err(e) => error!("분석 작업 종료 실패: {e}"),
            }
        });
    }

    fn on_sample(&mut self, sample: AlignmentSample) {
        self.latest_sample = Some(sample);
        let decision = self.gate.evaluate(&sample);
        debug!(
            "샘플 score={:.3} brightness={:.3} motion={:.3} → {:?}",
            sample.score, sample.brightness, sample.motion, decision
        );
        if decision == GateDecision::Verified {
            self.begin_persist();
        }
        self.publish();
    }

    // ============================================================
    // 저장
    // ============================================================

    fn begin_persist(&mut self) {
        if let Err(e) = self.sequencer.mark_verifying() {
            warn!("검증 전환 실패: {e}");
            return;
        }
        let Some(segment_id) = self.sequencer.current().map(|s| s.id.clone()) else {
            return;
        };
        let Some(session_id) = self.session.as_ref().map(|s| s.session_id.clone()) else {
            return;
        };
        info!("세그먼트 {segment_id} 검증 완료, 스틸 저장 시작");

        self.settle = Some(Settle {
            deadline: Some(Instant::now() + self.capture.settle_delay()),
            persisted: false,
        });

        let frames = self.frames.clone();
        let store = self.asset_store.clone();
        let events = self.events_tx.clone();
        let epoch = self.epoch;
        let format = self.still_format;
        let quality = self.still_quality;

        tokio::spawn(async move {
            let result =
                persist_still(frames, store, &session_id, &segment_id, format, quality).await;
            let _ = events.send(EngineEvent::Persisted {
                epoch,
                segment_id,
                result,
            });
        });
    }

    async fn on_persisted(&mut self, segment_id: SegmentId, result: Result<StoredAsset, CoreError>) {
        match result {
            Ok(stored) => {
                if let Err(e) = self.sequencer.mark_verified() {
                    warn!("저장 완료 전환 실패: {e}");
                    return;
                }
                let reference = StoredAssetReference::new(segment_id.clone(), stored);
                info!("세그먼트 {segment_id} 저장 완료: {}", reference.uri);

                if let (Some(journal), Some(session)) = (&self.journal, &self.session) {
                    if let Err(e) = journal.record_asset(&session.session_id, &reference).await {
                        warn!("자산 이력 기록 실패: {e}");
                    }
                }
                if let Some(session) = self.session.as_mut() {
                    if !session.insert_asset(reference) {
                        warn!("세그먼트 {segment_id} 자산 참조가 이미 존재");
                    }
                }

                let settled = match self.settle.as_mut() {
                    Some(settle) => {
                        settle.persisted = true;
                        settle.deadline.is_none()
                    }
                    None => false,
                };
                if settled {
                    self.advance_segment();
                }
            }
            Err(source) => {
                if let Err(e) = self.sequencer.mark_failed() {
                    warn!("실패 전환 실패: {e}");
                }
                self.settle = None;
                let error = CaptureError::Persistence { segment_id, source };
                error!("{error}");
                self.error = Some(SurfacedError::from(&error));
            }
        }
        self.publish();
    }

    fn on_settled(&mut self) {
        let ready = match self.settle.as_mut() {
            Some(settle) => {
                settle.deadline = None;
                settle.persisted
            }
            None => false,
        };
        if ready {
            self.advance_segment();
            self.publish();
        }
    }

    fn advance_segment(&mut self) {
        self.settle = None;
        match self.sequencer.advance() {
            Ok(Advance::Next(index)) => {
                if let Some(session) = self.session.as_mut() {
                    session.active_index = index;
                }
                self.enter_segment();
            }
            Ok(Advance::Complete) => {
                self.phase = SessionPhase::Assembling;
                self.analysis_after = None;
                self.readiness = Some(ReadinessCheck {
                    attempts: 0,
                    next_check: Instant::now(),
                });
            }
            Err(e) => warn!("세그먼트 이동 실패: {e}"),
        }
    }

    /// 세그먼트 활성화 직후 공통 초기화
    fn enter_segment(&mut self) {
        self.gate.reset();
        self.scorer_stale = true;
        self.latest_sample = None;
        self.analysis_after = Some(Instant::now() + self.capture.startup_delay());
    }

    // ============================================================
    // 조립 + 제출
    // ============================================================

    fn check_readiness(&mut self) {
        let readiness = match &self.session {
            Some(session) => Readiness::check(session, self.sequencer.segments()),
            None => {
                self.readiness = None;
                return;
            }
        };

        if readiness.is_complete() {
            self.readiness = None;
            self.begin_video_upload();
            return;
        }

        let retries = self.capture.readiness_retries;
        let backoff = self.capture.readiness_backoff();
        let exhausted = match self.readiness.as_mut() {
            Some(check) => {
                check.attempts += 1;
                check.next_check = Instant::now() + backoff;
                check.attempts > retries
            }
            None => return,
        };

        if exhausted {
            self.readiness = None;
            self.fail(&readiness.into_error());
        } else {
            warn!(
                "자산 준비 미완료 ({}/{}), {:?} 후 재확인",
                readiness.ready, readiness.total, backoff
            );
        }
    }

    fn begin_video_upload(&mut self) {
        let Some(session_id) = self.session.as_ref().map(|s| s.session_id.clone()) else {
            self.fail(&CaptureError::Media(CoreError::Media(
                "활성 세션 없음".to_string(),
            )));
            return;
        };
        let pending = match (self.recording.take(), self.pending_video.take()) {
            (Some(handle), _) => {
                if let Some(session) = self.session.as_mut() {
                    session.video_chunks = handle.chunk_count();
                }
                PendingVideo::Recording(handle)
            }
            (None, Some(video)) => PendingVideo::Assembled(video),
            (None, None) => {
                self.fail(&CaptureError::Media(CoreError::Media(
                    "세션 영상 없음".to_string(),
                )));
                return;
            }
        };

        self.phase = SessionPhase::Assembling;
        self.publish();

        let orchestrator = self.orchestrator.clone();
        let events = self.events_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = orchestrator.upload_video(&session_id, pending).await;
            let _ = events.send(EngineEvent::VideoUploaded { epoch, result });
        });
    }

    fn on_video_uploaded(&mut self, result: Result<VideoLocation, VideoUploadFailure>) {
        match result {
            Ok(location) => {
                if let Some(session) = self.session.as_mut() {
                    session.video = Some(location);
                }
                self.begin_submission();
            }
            Err(failure) => {
                self.pending_video = failure.video;
                self.fail(&failure.error);
            }
        }
    }

    fn begin_submission(&mut self) {
        if self.submitted {
            warn!("이미 제출된 세션, 제출 생략");
            return;
        }
        let Some(session) = self.session.clone() else {
            return;
        };
        let segments: Vec<Segment> = self.sequencer.segments().to_vec();

        self.phase = SessionPhase::Submitting;
        self.publish();

        let orchestrator = self.orchestrator.clone();
        let events = self.events_tx.clone();
        let epoch = self.epoch;
        tokio::spawn(async move {
            let result = orchestrator.submit(&session, &segments).await;
            let _ = events.send(EngineEvent::Submitted { epoch, result });
        });
    }

    fn on_submitted(&mut self, result: Result<SubmissionReceipt, CaptureError>) {
        match result {
            Ok(receipt) => {
                let elapsed = self
                    .session
                    .as_ref()
                    .map(|s| s.elapsed(chrono::Utc::now()).num_seconds())
                    .unwrap_or_default();
                info!(
                    "세션 제출 완료: inspection_id={} ({}), 소요 {elapsed}초",
                    receipt.inspection_id, receipt.status
                );
                self.submitted = true;
                self.inspection_id = Some(receipt.inspection_id);
                self.error = None;
                self.phase = SessionPhase::Done;
                self.publish();
            }
            Err(e) => self.fail(&e),
        }
    }

    // ============================================================
    // 공통
    // ============================================================

    async fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Analyzed {
                epoch,
                index,
                scorer,
                sample,
            } => {
                self.scorer = Some(scorer);
                let current = self.phase == SessionPhase::Recording
                    && epoch == self.epoch
                    && index == self.sequencer.current_index()
                    && self
                        .sequencer
                        .current()
                        .is_some_and(|s| s.status == SegmentStatus::Capturing);
                if current {
                    self.on_sample(sample);
                } else {
                    debug!("지난 분석 결과 폐기 (epoch {epoch}, index {index})");
                }
            }
            EngineEvent::Persisted {
                epoch,
                segment_id,
                result,
            } => {
                if epoch == self.epoch && self.phase == SessionPhase::Recording {
                    self.on_persisted(segment_id, result).await;
                } else {
                    debug!("지난 저장 결과 폐기: {segment_id}");
                }
            }
            EngineEvent::VideoUploaded { epoch, result } => {
                if epoch == self.epoch && self.phase == SessionPhase::Assembling {
                    self.on_video_uploaded(result);
                } else {
                    debug!("지난 영상 업로드 결과 폐기");
                }
            }
            EngineEvent::Submitted { epoch, result } => {
                if epoch == self.epoch && self.phase == SessionPhase::Submitting {
                    self.on_submitted(result);
                } else {
                    debug!("지난 제출 결과 폐기");
                }
            }
        }
    }

    /// 세션을 Error 단계로 전환
    fn fail(&mut self, error: &CaptureError) {
        error!("캡처 세션 실패: {error}");
        self.error = Some(SurfacedError::from(error));
        self.phase = SessionPhase::Error;
        self.settle = None;
        self.readiness = None;
        self.analysis_after = None;
        if let Some(handle) = self.recording.take() {
            tokio::spawn(handle.cancel());
        }
        self.publish();
    }

    fn snapshot(&self) -> EngineSnapshot {
        let segments = self.sequencer.segments();
        let active = self.sequencer.current().map(|s| ActiveSegment {
            index: s.order,
            total: segments.len(),
            id: s.id.clone(),
            label: s.label.clone(),
            instruction: s.instruction.clone(),
            status: s.status,
        });

        EngineSnapshot {
            phase: self.phase,
            session_id: self.session.as_ref().map(|s| s.session_id.clone()),
            vehicle_id: self.session.as_ref().map(|s| s.vehicle_id.clone()),
            active,
            segments: segments
                .iter()
                .map(|s| SegmentProgress {
                    id: s.id.clone(),
                    status: s.status,
                })
                .collect(),
            latest_sample: self.latest_sample,
            consecutive_passes: self.gate.consecutive(),
            required_passes: self.gate.required(),
            assets_stored: self.session.as_ref().map_or(0, |s| s.asset_count()),
            video_chunks: match &self.recording {
                Some(handle) => handle.chunk_count(),
                None => self.session.as_ref().map_or(0, |s| s.video_chunks),
            },
            inspection_id: self.inspection_id.clone(),
            error: self.error.clone(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}

fn respond(reply: Reply, result: Result<(), CaptureError>) {
    if let Err(e) = &result {
        warn!("명령 거부: {e}");
    }
    let _ = reply.send(result);
}

/// 패닉이 나도 스코어러를 잃지 않도록 감싼 분석
fn score_guarded(
    scorer: &mut dyn FrameScorer,
    frame: &CameraFrame,
    segment: &Segment,
) -> AlignmentSample {
    match std::panic::catch_unwind(AssertUnwindSafe(|| scorer.score(frame, segment))) {
        Ok(sample) => sample,
        Err(_) => {
            let error = CaptureError::Analysis(CoreError::Internal(format!(
                "세그먼트 {} 분석 중 패닉",
                segment.id
            )));
            error!("{error}, 0 샘플 사용");
            scorer.reset();
            AlignmentSample::zero()
        }
    }
}

async fn persist_still(
    frames: Arc<dyn FrameSource>,
    store: Arc<dyn AssetStore>,
    session_id: &str,
    segment_id: &SegmentId,
    format: StillFormat,
    quality: u8,
) -> Result<StoredAsset, CoreError> {
    let frame = frames.current_frame().await?;
    let still = tokio::task::spawn_blocking(move || encode_still(&frame, format, quality))
        .await
        .map_err(|e| CoreError::Internal(format!("스틸 인코딩 작업 실패: {e}")))??;
    store
        .persist(session_id, segment_id, still.bytes, still.content_type)
        .await
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn wait_recording_failure(recording: &mut Option<RecordingHandle>) -> CoreError {
    match recording.as_mut() {
        Some(handle) => handle.failed().await,
        None => std::future::pending().await,
    }
}
