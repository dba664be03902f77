//! 원격 오브젝트 저장소 어댑터.
//!
//! `AssetStore` + `VideoStore` 포트 구현.
//! - 스틸 이미지: `POST /v1/assets` (base64 JSON, 본문에 `session_id`)
//! - 세션 영상: `POST /v1/videos` (원본 바이트, `X-Session-Id` 헤더)
//!
//! 일시적 실패는 exponential backoff로 재시도한다.

use async_trait::async_trait;
use autoscan_core::error::CoreError;
use autoscan_core::models::asset::{StoredAsset, VideoLocation};
use autoscan_core::models::segment::SegmentId;
use autoscan_core::ports::storage::{AssetStore, VideoStore};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::http_client::HttpTransport;

/// 영상 업로드 세션 헤더
const SESSION_HEADER: &str = "x-session-id";

/// 자산 업로드 요청 본문
#[derive(Debug, Serialize)]
struct AssetUploadRequest<'a> {
    session_id: &'a str,
    segment_id: &'a str,
    content_type: &'a str,
    /// base64 인코딩 이미지
    data: String,
}

/// 자산 업로드 응답
#[derive(Debug, Deserialize)]
struct AssetUploadResponse {
    location: String,
    uri: String,
}

/// 영상 업로드 응답
#[derive(Debug, Deserialize)]
struct VideoUploadResponse {
    uri: String,
}

/// 원격 자산 저장소
pub struct RemoteAssetStore {
    transport: Arc<HttpTransport>,
}

impl RemoteAssetStore {
    /// 새 원격 저장소 생성
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl AssetStore for RemoteAssetStore {
    async fn persist(
        &self,
        session_id: &str,
        segment_id: &SegmentId,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredAsset, CoreError> {
        let body = AssetUploadRequest {
            session_id,
            segment_id: segment_id.as_str(),
            content_type,
            data: B64.encode(&bytes),
        };
        let body = &body;
        let transport = &self.transport;
        debug!("자산 업로드 요청: {segment_id} ({} bytes)", bytes.len());

        let stored = transport
            .execute_with_retry(|| async move {
                let req = transport.request(reqwest::Method::POST, "/v1/assets").json(body);
                let resp = transport.send(req, "자산 업로드").await?;
                resp.json::<AssetUploadResponse>()
                    .await
                    .map_err(|e| CoreError::Internal(format!("자산 응답 파싱 실패: {e}")))
            })
            .await?;

        debug!("자산 업로드 성공: {segment_id} → {}", stored.uri);
        Ok(StoredAsset {
            location: stored.location,
            uri: stored.uri,
        })
    }
}

#[async_trait]
impl VideoStore for RemoteAssetStore {
    async fn upload_video(
        &self,
        session_id: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<VideoLocation, CoreError> {
        let size = bytes.len();
        let bytes = &bytes;
        let transport = &self.transport;

        let uploaded = transport
            .execute_with_retry(|| async move {
                let req = transport
                    .request(reqwest::Method::POST, "/v1/videos")
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .header(SESSION_HEADER, session_id)
                    .body(bytes.clone());
                let resp = transport.send(req, "영상 업로드").await?;
                resp.json::<VideoUploadResponse>()
                    .await
                    .map_err(|e| CoreError::Internal(format!("영상 응답 파싱 실패: {e}")))
            })
            .await?;

        info!("세션 영상 업로드 완료: {size} bytes → {}", uploaded.uri);
        Ok(VideoLocation { uri: uploaded.uri })
    }
}
