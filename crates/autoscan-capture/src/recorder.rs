//! 세션 레코더.
//!
//! 세션 시작부터 마지막 세그먼트 완료까지 영상 소스를 연속 녹화한다.
//! 청크 간격마다 소스에서 청크를 읽어 순서대로 쌓고, 정지 시 마지막 청크를
//! 비운 뒤 하나의 `VideoObject`로 조립한다.

use autoscan_core::error::CoreError;
use autoscan_core::models::asset::{VideoChunk, VideoObject};
use autoscan_core::ports::camera::VideoSource;
use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::CaptureError;

/// 세션 레코더
pub struct SessionRecorder {
    source: Arc<dyn VideoSource>,
    chunk_interval: Duration,
}

impl SessionRecorder {
    /// 새 레코더 생성
    pub fn new(source: Arc<dyn VideoSource>, chunk_interval: Duration) -> Self {
        Self {
            source,
            chunk_interval,
        }
    }

    /// 녹화 시작
    pub async fn start(&self) -> Result<RecordingHandle, CaptureError> {
        self.source.start().await.map_err(CaptureError::Media)?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let (failure_tx, failure_rx) = oneshot::channel();
        let chunks = Arc::new(AtomicU32::new(0));
        let content_type = self.source.content_type().to_string();

        let task = tokio::spawn(record_loop(
            self.source.clone(),
            self.chunk_interval,
            stop_rx,
            failure_tx,
            chunks.clone(),
        ));

        info!("세션 녹화 시작 (청크 간격 {:?})", self.chunk_interval);
        Ok(RecordingHandle {
            stop_tx: Some(stop_tx),
            failure_rx: Some(failure_rx),
            task,
            chunks,
            content_type,
            started_at: Instant::now(),
        })
    }
}

/// 진행 중인 녹화 핸들
pub struct RecordingHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    failure_rx: Option<oneshot::Receiver<CoreError>>,
    task: JoinHandle<Result<Vec<VideoChunk>, CoreError>>,
    chunks: Arc<AtomicU32>,
    content_type: String,
    started_at: Instant,
}

impl RecordingHandle {
    /// 지금까지 기록된 청크 수
    pub fn chunk_count(&self) -> u32 {
        self.chunks.load(Ordering::Relaxed)
    }

    /// 녹화 도중 소스 실패를 기다림 (실패가 없으면 계속 대기)
    pub async fn failed(&mut self) -> CoreError {
        let Some(rx) = self.failure_rx.as_mut() else {
            return std::future::pending().await;
        };
        let result = rx.await;
        self.failure_rx = None;
        match result {
            Ok(error) => error,
            Err(_) => std::future::pending().await,
        }
    }

    /// 녹화 정지 후 영상 조립
    pub async fn stop(mut self) -> Result<VideoObject, CaptureError> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }

        let chunks = match self.task.await {
            Ok(Ok(chunks)) => chunks,
            Ok(Err(e)) => return Err(CaptureError::Media(e)),
            Err(e) => {
                return Err(CaptureError::Media(CoreError::Internal(format!(
                    "녹화 태스크 종료 실패: {e}"
                ))))
            }
        };

        let duration_ms = self.started_at.elapsed().as_millis() as u64;
        let video = VideoObject::assemble(chunks, &self.content_type, duration_ms);
        info!(
            "세션 녹화 종료: {}개 청크, {} bytes, {}ms",
            video.chunk_count,
            video.bytes.len(),
            video.duration_ms
        );
        Ok(video)
    }

    /// 녹화 취소 (결과 폐기)
    pub async fn cancel(self) {
        match self.stop().await {
            Ok(video) => debug!("녹화 취소, {}개 청크 폐기", video.chunk_count),
            Err(e) => warn!("녹화 취소 중 에러: {e}"),
        }
    }
}

async fn record_loop(
    source: Arc<dyn VideoSource>,
    chunk_interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
    failure_tx: oneshot::Sender<CoreError>,
    counter: Arc<AtomicU32>,
) -> Result<Vec<VideoChunk>, CoreError> {
    let mut chunks = Vec::new();
    let mut ticker = tokio::time::interval_at(Instant::now() + chunk_interval, chunk_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                match read_chunk(source.as_ref(), &mut chunks, &counter).await {
                    Ok(()) => {}
                    Err(e) => {
                        warn!("녹화 청크 읽기 실패: {e}");
                        let message = e.to_string();
                        let _ = failure_tx.send(e);
                        let _ = source.stop().await;
                        return Err(CoreError::Media(message));
                    }
                }
            }
        }
    }

    // 마지막 청크 flush
    read_chunk(source.as_ref(), &mut chunks, &counter).await?;
    source.stop().await?;
    Ok(chunks)
}

async fn read_chunk(
    source: &dyn VideoSource,
    chunks: &mut Vec<VideoChunk>,
    counter: &AtomicU32,
) -> Result<(), CoreError> {
    let started_at = Utc::now();
    let bytes = source.read_chunk().await?;
    if bytes.is_empty() {
        return Ok(());
    }
    let sequence = chunks.len() as u32;
    debug!("녹화 청크 #{sequence}: {} bytes", bytes.len());
    chunks.push(VideoChunk {
        sequence,
        bytes,
        started_at,
    });
    counter.store(chunks.len() as u32, Ordering::Relaxed);
    Ok(())
}
