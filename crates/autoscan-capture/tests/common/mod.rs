//! 엔진 통합 테스트용 스텁 포트

#![allow(dead_code)]

use async_trait::async_trait;
use autoscan_capture::{CaptureEngine, EngineHandle, EnginePorts, EngineSnapshot};
use autoscan_core::config::AppConfig;
use autoscan_core::error::CoreError;
use autoscan_core::models::asset::{StoredAsset, VideoLocation};
use autoscan_core::models::frame::CameraFrame;
use autoscan_core::models::sample::AlignmentSample;
use autoscan_core::models::segment::{Segment, SegmentId};
use autoscan_core::models::submission::{SubmissionReceipt, SubmissionRequest};
use autoscan_core::ports::api_client::InspectionApi;
use autoscan_core::ports::camera::{FrameSource, VideoSource};
use autoscan_core::ports::storage::{AssetStore, VideoStore};
use autoscan_core::ports::vision::FrameScorer;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// 고정 프레임 소스
#[derive(Default)]
pub struct StubFrames {
    pub broken: AtomicBool,
}

#[async_trait]
impl FrameSource for StubFrames {
    async fn current_frame(&self) -> Result<CameraFrame, CoreError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(CoreError::Media("frame grab failed".to_string()));
        }
        Ok(CameraFrame::new(8, 8, vec![128; 8 * 8 * 4]))
    }
}

/// 항상 정렬된 샘플을 돌려주고 분석 대상 세그먼트를 기록하는 스코어러
pub struct ScriptedScorer {
    pub log: Arc<Mutex<Vec<SegmentId>>>,
}

impl FrameScorer for ScriptedScorer {
    fn score(&mut self, _frame: &CameraFrame, segment: &Segment) -> AlignmentSample {
        self.log.lock().unwrap().push(segment.id.clone());
        AlignmentSample::new(0.6, 0.5, 0.02)
    }

    fn reset(&mut self) {}
}

/// 청크 바이트를 돌려주는 영상 소스
#[derive(Default)]
pub struct StubVideo {
    pub reads: AtomicU32,
    pub fail_from: Mutex<Option<u32>>,
    pub starts: AtomicU32,
    pub stops: AtomicU32,
}

#[async_trait]
impl VideoSource for StubVideo {
    async fn start(&self) -> Result<(), CoreError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_chunk(&self) -> Result<Vec<u8>, CoreError> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(from) = *self.fail_from.lock().unwrap() {
            if n >= from {
                return Err(CoreError::Media("encoder lost".to_string()));
            }
        }
        Ok(vec![0xAB; 4])
    }

    async fn stop(&self) -> Result<(), CoreError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn content_type(&self) -> &str {
        "video/x-motion-jpeg"
    }
}

/// 메모리 자산 저장소 (세그먼트별 1회 실패/지연 주입)
#[derive(Default)]
pub struct MemoryAssets {
    pub calls: Mutex<HashMap<String, u32>>,
    pub fail_once: Mutex<HashSet<String>>,
    pub delay_once: Mutex<HashMap<String, Duration>>,
    /// 저장 완료 순서대로 (세션 ID, 세그먼트 ID)
    pub writes: Mutex<Vec<(String, String)>>,
}

impl MemoryAssets {
    pub fn calls_for(&self, id: &str) -> u32 {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn sessions_written(&self, id: &str) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, segment)| segment == id)
            .map(|(session, _)| session.clone())
            .collect()
    }
}

#[async_trait]
impl AssetStore for MemoryAssets {
    async fn persist(
        &self,
        session_id: &str,
        segment_id: &SegmentId,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredAsset, CoreError> {
        assert!(!bytes.is_empty());
        assert_eq!(content_type, "image/jpeg");
        *self
            .calls
            .lock()
            .unwrap()
            .entry(segment_id.to_string())
            .or_default() += 1;
        let delay = self.delay_once.lock().unwrap().remove(segment_id.as_str());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_once.lock().unwrap().remove(segment_id.as_str()) {
            return Err(CoreError::Storage("disk full".to_string()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((session_id.to_string(), segment_id.to_string()));
        Ok(StoredAsset {
            location: format!("mem/{session_id}/{segment_id}"),
            uri: format!("mem://{session_id}/{segment_id}.jpg"),
        })
    }
}

/// 메모리 영상 저장소
#[derive(Default)]
pub struct MemoryVideos {
    pub uploads: AtomicU32,
    pub bytes: Mutex<Vec<u8>>,
}

#[async_trait]
impl VideoStore for MemoryVideos {
    async fn upload_video(
        &self,
        _session_id: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<VideoLocation, CoreError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        *self.bytes.lock().unwrap() = bytes;
        Ok(VideoLocation {
            uri: "mem://session.mjpeg".to_string(),
        })
    }
}

/// 요청을 기록하는 점검 API (앞선 N회 실패 주입)
#[derive(Default)]
pub struct StubApi {
    pub requests: Mutex<Vec<SubmissionRequest>>,
    pub failures: AtomicU32,
}

impl StubApi {
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl InspectionApi for StubApi {
    async fn submit_inspection(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, CoreError> {
        self.requests.lock().unwrap().push(request.clone());
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(CoreError::ServiceUnavailable("maintenance".to_string()));
        }
        Ok(SubmissionReceipt {
            inspection_id: "insp_7".to_string(),
            status: "queued".to_string(),
        })
    }
}

pub struct Harness {
    pub handle: EngineHandle,
    pub frames: Arc<StubFrames>,
    pub video: Arc<StubVideo>,
    pub assets: Arc<MemoryAssets>,
    pub videos: Arc<MemoryVideos>,
    pub api: Arc<StubApi>,
    pub scored: Arc<Mutex<Vec<SegmentId>>>,
    pub task: JoinHandle<()>,
}

impl Harness {
    pub fn spawn() -> Self {
        let frames = Arc::new(StubFrames::default());
        let video = Arc::new(StubVideo::default());
        let assets = Arc::new(MemoryAssets::default());
        let videos = Arc::new(MemoryVideos::default());
        let api = Arc::new(StubApi::default());
        let scored = Arc::new(Mutex::new(Vec::new()));

        let (engine, handle) = CaptureEngine::new(
            &AppConfig::default_config(),
            EnginePorts {
                frames: frames.clone(),
                video: video.clone(),
                asset_store: assets.clone(),
                video_store: videos.clone(),
                inspection_api: api.clone(),
                journal: None,
                scorer: Box::new(ScriptedScorer {
                    log: scored.clone(),
                }),
            },
        );
        let task = tokio::spawn(engine.run());

        Self {
            handle,
            frames,
            video,
            assets,
            videos,
            api,
            scored,
            task,
        }
    }

    /// 조건을 만족하는 스냅샷까지 대기 (가상 시간 1시간 제한)
    pub async fn wait_for(&self, predicate: impl FnMut(&EngineSnapshot) -> bool) -> EngineSnapshot {
        let mut rx = self.handle.subscribe();
        let snapshot = tokio::time::timeout(Duration::from_secs(3_600), rx.wait_for(predicate))
            .await
            .expect("snapshot wait timed out")
            .expect("engine stopped");
        snapshot.clone()
    }

    pub fn scored_ids(&self) -> Vec<String> {
        self.scored
            .lock()
            .unwrap()
            .iter()
            .map(|id| id.to_string())
            .collect()
    }
}
