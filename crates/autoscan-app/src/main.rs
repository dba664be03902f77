//! # autoscan-app
//!
//! AUTOSCAN 캡처 바이너리 진입점.
//! 설정 로드, 어댑터 와이어링, 캡처 엔진 실행, 라이프사이클 관리.

mod lifecycle;
mod presenter;
mod replay_camera;
mod wiring;

use anyhow::{anyhow, Context, Result};
use autoscan_capture::error::RecoveryAction;
use autoscan_capture::{CaptureEngine, EngineSnapshot};
use autoscan_core::config::{AppConfig, StorageStrategy};
use autoscan_core::config_manager::ConfigManager;
use autoscan_core::models::segment::SegmentStatus;
use autoscan_core::models::submission::SessionPhase;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::lifecycle::LifecycleManager;
use crate::replay_camera::ReplayCamera;

/// 리플레이 프레임 최대 너비
const REPLAY_MAX_WIDTH: u32 = 1280;

/// AUTOSCAN 차량 외관 가이드 촬영
///
/// 차량 주위 10개 지점을 순서대로 촬영하고 점검 요청을 제출한다
#[derive(Parser, Debug)]
#[command(name = "autoscan")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 차량 식별자 (VIN 등)
    #[arg(long, short = 'v')]
    vehicle_id: String,

    /// 카메라 대신 재생할 이미지 디렉터리
    #[arg(long, short = 'f')]
    frames: PathBuf,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉터리)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 데이터 저장 경로 (기본: 설정값 또는 플랫폼 데이터 디렉터리)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 처리 서비스 URL (기본: http://localhost:8000)
    #[arg(long, short = 's')]
    server: Option<String>,

    /// 저장 전략 (local, remote)
    #[arg(long, value_parser = ["local", "remote"])]
    storage: Option<String>,

    /// 세그먼트 저장 실패 시 자동 재촬영 횟수
    #[arg(long, default_value = "2")]
    segment_retries: u32,

    /// 제출 실패 시 자동 재제출 횟수
    #[arg(long, default_value = "1")]
    submit_retries: u32,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

/// 설정 로드 + CLI 오버라이드
fn load_config(args: &Args) -> Result<AppConfig> {
    let manager = match &args.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    let mut config = match manager {
        Ok(manager) => {
            info!("설정 파일: {}", manager.config_path().display());
            manager.get()
        }
        Err(e) => {
            warn!("설정 관리자 초기화 실패, 기본 설정 사용: {e}");
            AppConfig::default_config()
        }
    };

    if let Some(server) = &args.server {
        config.server.base_url = server.clone();
    }
    match args.storage.as_deref() {
        Some("local") => config.storage.strategy = StorageStrategy::Local,
        Some("remote") => config.storage.strategy = StorageStrategy::Remote,
        _ => {}
    }
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = Some(dir.clone());
    }

    config.validate().context("설정 검증 실패")?;
    Ok(config)
}

/// 데이터 디렉터리 결정 (설정값 → 플랫폼 기본 → 현재 디렉터리)
fn resolve_data_dir(config: &AppConfig) -> PathBuf {
    config
        .storage
        .data_dir
        .clone()
        .or_else(|| ConfigManager::data_dir().ok())
        .unwrap_or_else(|| PathBuf::from("./autoscan-data"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_filter = [
        "autoscan",
        "autoscan_app",
        "autoscan_core",
        "autoscan_vision",
        "autoscan_storage",
        "autoscan_network",
        "autoscan_capture",
    ]
    .iter()
    .map(|target| format!("{target}={}", args.log_level))
    .collect::<Vec<_>>()
    .join(",");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    info!("AUTOSCAN 시작: 차량 {}", args.vehicle_id);

    let config = load_config(&args)?;
    let data_dir = resolve_data_dir(&config);
    info!(
        "서버: {}, 데이터: {}",
        config.server.base_url,
        data_dir.display()
    );

    // ── 어댑터 생성 ──
    let camera = Arc::new(
        ReplayCamera::from_dir(&args.frames, REPLAY_MAX_WIDTH, config.vision.still_quality)
            .with_context(|| format!("리플레이 카메라 생성 실패: {}", args.frames.display()))?,
    );
    let ports = wiring::build_ports(&config, &data_dir, camera.clone(), camera).await?;

    // ── 태스크 시작 ──
    let lifecycle = Arc::new(LifecycleManager::new());
    let (engine, handle) = CaptureEngine::new(&config, ports);
    let engine_task = tokio::spawn(engine.run());
    tokio::spawn(presenter::run_presenter(
        handle.subscribe(),
        lifecycle.subscribe(),
    ));
    {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.wait_for_signal().await });
    }

    handle.start(args.vehicle_id.clone()).await?;
    info!("촬영 진행 중 (Ctrl+C로 취소)");

    // ── 운영자 복구 정책 ──
    let mut snapshots = handle.subscribe();
    let mut shutdown_rx = lifecycle.subscribe();
    let mut segment_retries = 0;
    let mut submit_retries = 0;

    let outcome: Result<EngineSnapshot> = loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break Err(anyhow!("캡처 엔진이 예기치 않게 종료됨"));
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let recovery = snapshot.error.as_ref().and_then(|e| e.recovery);

                match (snapshot.phase, recovery) {
                    (SessionPhase::Done, _) => break Ok(snapshot),
                    (SessionPhase::Recording, Some(RecoveryAction::RetrySegment)) => {
                        let failed = snapshot
                            .active
                            .as_ref()
                            .filter(|a| a.status == SegmentStatus::Failed)
                            .map(|a| a.id.clone());
                        let Some(segment_id) = failed else { continue };
                        if segment_retries >= args.segment_retries {
                            handle.cancel().await?;
                            break Err(anyhow!("세그먼트 {segment_id} 재촬영 한도 초과"));
                        }
                        segment_retries += 1;
                        warn!("세그먼트 {segment_id} 재촬영 ({segment_retries}/{})", args.segment_retries);
                        handle.retry_segment(segment_id).await?;
                    }
                    (SessionPhase::Error, Some(RecoveryAction::RetrySubmission))
                        if submit_retries < args.submit_retries =>
                    {
                        submit_retries += 1;
                        warn!("제출 재시도 ({submit_retries}/{})", args.submit_retries);
                        handle.retry_submission().await?;
                    }
                    (SessionPhase::Error, _) => {
                        let message = snapshot
                            .error
                            .map(|e| e.message)
                            .unwrap_or_else(|| "알 수 없는 에러".to_string());
                        break Err(anyhow!("캡처 세션 실패: {message}"));
                    }
                    _ => {}
                }
            }
            _ = shutdown_rx.changed() => {
                info!("종료 요청, 세션 취소");
                handle.cancel().await?;
                break Err(anyhow!("사용자 취소"));
            }
        }
    };

    // ── 정리 ──
    lifecycle.shutdown();
    drop(snapshots);
    drop(handle);
    if let Err(e) = engine_task.await {
        error!("캡처 엔진 태스크 종료 실패: {e}");
    }

    match outcome {
        Ok(snapshot) => {
            info!(
                "AUTOSCAN 완료: inspection_id={}, 이미지 {}개, 영상 청크 {}개",
                snapshot.inspection_id.as_deref().unwrap_or("-"),
                snapshot.assets_stored,
                snapshot.video_chunks
            );
            Ok(())
        }
        Err(e) => {
            error!("{e}");
            Err(e)
        }
    }
}
