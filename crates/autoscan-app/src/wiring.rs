//! 어댑터 생성 (DI 와이어링).
//!
//! 설정의 저장 전략에 따라 로컬/원격 저장소를 고르고,
//! 점검 API, 캡처 저널, 분석기를 엔진 포트로 묶는다.

use anyhow::{Context, Result};
use autoscan_capture::EnginePorts;
use autoscan_core::config::{AppConfig, StorageStrategy};
use autoscan_core::ports::camera::{FrameSource, VideoSource};
use autoscan_core::ports::storage::{AssetStore, CaptureJournal, VideoStore};
use autoscan_network::asset_client::RemoteAssetStore;
use autoscan_network::http_client::HttpTransport;
use autoscan_network::inspection_client::HttpInspectionClient;
use autoscan_storage::asset_store::LocalAssetStore;
use autoscan_storage::journal::SqliteJournal;
use autoscan_vision::analyzer::AlignmentAnalyzer;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 설정으로부터 엔진 포트 구성
pub async fn build_ports(
    config: &AppConfig,
    data_dir: &Path,
    frames: Arc<dyn FrameSource>,
    video: Arc<dyn VideoSource>,
) -> Result<EnginePorts> {
    let transport = Arc::new(
        HttpTransport::new(
            &config.server.base_url,
            config.server.api_token.clone(),
            config.request_timeout(),
        )?
        .with_max_retries(config.server.max_retries),
    );

    let (asset_store, video_store): (Arc<dyn AssetStore>, Arc<dyn VideoStore>) =
        match config.storage.strategy {
            StorageStrategy::Local => {
                let store = Arc::new(
                    LocalAssetStore::new(data_dir)
                        .await
                        .with_context(|| format!("로컬 저장소 생성 실패: {}", data_dir.display()))?,
                );
                info!("저장 전략: 로컬 ({})", store.base_dir().display());
                (store.clone() as Arc<dyn AssetStore>, store as Arc<dyn VideoStore>)
            }
            StorageStrategy::Remote => {
                let store = Arc::new(RemoteAssetStore::new(transport.clone()));
                info!("저장 전략: 원격 ({})", transport.base_url());
                (store.clone() as Arc<dyn AssetStore>, store as Arc<dyn VideoStore>)
            }
        };

    let journal: Option<Arc<dyn CaptureJournal>> = if config.storage.journal_enabled {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("데이터 디렉터리 생성 실패: {}", data_dir.display()))?;
        let path = data_dir.join("journal.db");
        let journal = SqliteJournal::open(&path)
            .with_context(|| format!("캡처 저널 열기 실패: {}", path.display()))?;
        info!("캡처 저널: {}", path.display());
        Some(Arc::new(journal))
    } else {
        None
    };

    Ok(EnginePorts {
        frames,
        video,
        asset_store,
        video_store,
        inspection_api: Arc::new(HttpInspectionClient::new(transport)),
        journal,
        scorer: Box::new(AlignmentAnalyzer::new(config.vision.clone())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay_camera::ReplayCamera;
    use autoscan_core::models::frame::CameraFrame;
    use tempfile::TempDir;

    fn camera() -> Arc<ReplayCamera> {
        Arc::new(
            ReplayCamera::from_frames(vec![CameraFrame::new(4, 4, vec![50; 64])], 80).unwrap(),
        )
    }

    #[tokio::test]
    async fn local_strategy_with_journal() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::default_config();
        let cam = camera();
        let ports = build_ports(&config, dir.path(), cam.clone(), cam)
            .await
            .unwrap();
        assert!(ports.journal.is_some());
        assert!(dir.path().join("journal.db").exists());
    }

    #[tokio::test]
    async fn remote_strategy_without_journal() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default_config();
        config.storage.strategy = StorageStrategy::Remote;
        config.storage.journal_enabled = false;
        let cam = camera();
        let ports = build_ports(&config, dir.path(), cam.clone(), cam)
            .await
            .unwrap();
        assert!(ports.journal.is_none());
        assert!(!dir.path().join("journal.db").exists());
    }
}
