//! 로컬 자산 파일 저장소.
//!
//! 세그먼트 스틸 이미지와 세션 영상을 로컬 파일 시스템에 저장.
//! 구조: `<base_dir>/sessions/<session_id>/<segment_id>.<ext>`
//!
//! 임시 파일에 쓴 뒤 rename하여 부분 기록된 파일이 남지 않게 한다.

use async_trait::async_trait;
use autoscan_core::error::CoreError;
use autoscan_core::models::asset::{StoredAsset, VideoLocation};
use autoscan_core::models::segment::SegmentId;
use autoscan_core::ports::storage::{AssetStore, VideoStore};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// 세션 영상 파일 이름 (확장자 제외)
const VIDEO_FILE_STEM: &str = "session";

/// MIME 타입 → 파일 확장자
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/png" => "png",
        "video/x-motion-jpeg" => "mjpeg",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        _ => "bin",
    }
}

/// 세션 ID가 단일 경로 구성요소로 안전한지 (영숫자, `_`, `-`)
fn is_safe_component(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// 로컬 자산 저장소: `AssetStore` + `VideoStore` 포트 구현
///
/// 저장 위치는 호출마다 전달되는 세션 ID로만 결정된다. 취소된 세션의
/// 늦은 저장 작업은 자기 세션 디렉토리에만 쓴다.
pub struct LocalAssetStore {
    /// 절대 경로로 정규화된 기본 디렉토리
    base_dir: PathBuf,
}

impl LocalAssetStore {
    /// 새 로컬 저장소 생성
    ///
    /// `base_dir/sessions` 디렉토리를 만들고 기본 경로를 절대 경로로 정규화한다.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self, CoreError> {
        let sessions_dir = base_dir.as_ref().join("sessions");
        fs::create_dir_all(&sessions_dir)
            .await
            .map_err(|e| CoreError::Storage(format!("세션 디렉토리 생성 실패: {e}")))?;
        let base_dir = fs::canonicalize(base_dir.as_ref())
            .await
            .map_err(|e| CoreError::Storage(format!("저장소 경로 정규화 실패: {e}")))?;

        info!("로컬 자산 저장소 초기화: {}", base_dir.display());

        Ok(Self { base_dir })
    }

    /// 기본 디렉토리
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// 상대 위치 → 절대 경로
    pub fn resolve(&self, location: &str) -> PathBuf {
        self.base_dir.join(location)
    }

    /// 세션 디렉토리에 파일 기록 (임시 파일 → rename)
    async fn write_file(
        &self,
        session_id: &str,
        stem: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<StoredAsset, CoreError> {
        if !is_safe_component(session_id) {
            return Err(CoreError::Validation {
                field: "session_id".to_string(),
                message: format!("경로에 사용할 수 없는 세션 ID: {session_id:?}"),
            });
        }
        let session_dir = self.base_dir.join("sessions").join(session_id);
        fs::create_dir_all(&session_dir)
            .await
            .map_err(|e| CoreError::Storage(format!("세션 디렉토리 생성 실패: {e}")))?;

        let file_name = format!("{stem}.{}", extension_for(content_type));
        let final_path = session_dir.join(&file_name);
        let temp_path = session_dir.join(format!(".{file_name}.tmp"));

        fs::write(&temp_path, bytes)
            .await
            .map_err(|e| CoreError::Storage(format!("파일 저장 실패: {}: {e}", temp_path.display())))?;
        fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| CoreError::Storage(format!("파일 이동 실패: {}: {e}", final_path.display())))?;

        let location = format!("sessions/{session_id}/{file_name}");
        let uri = file_uri(&final_path);
        debug!("자산 저장: {} ({} bytes)", location, bytes.len());

        Ok(StoredAsset { location, uri })
    }
}

/// 절대 경로 → `file://` URI
fn file_uri(path: &Path) -> String {
    let display = path.to_string_lossy().replace('\\', "/");
    if display.starts_with('/') {
        format!("file://{display}")
    } else {
        format!("file:///{display}")
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn persist(
        &self,
        session_id: &str,
        segment_id: &SegmentId,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredAsset, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::Storage(format!("빈 이미지: {segment_id}")));
        }
        self.write_file(session_id, segment_id.as_str(), &bytes, content_type)
            .await
    }
}

#[async_trait]
impl VideoStore for LocalAssetStore {
    async fn upload_video(
        &self,
        session_id: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<VideoLocation, CoreError> {
        let stored = self
            .write_file(session_id, VIDEO_FILE_STEM, &bytes, content_type)
            .await?;
        info!("세션 영상 저장: {} ({} bytes)", stored.location, bytes.len());
        Ok(VideoLocation { uri: stored.uri })
    }
}
