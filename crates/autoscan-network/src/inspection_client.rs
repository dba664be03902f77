//! 점검 요청 제출 클라이언트.
//!
//! `InspectionApi` 포트 구현. `POST /v1/inspections`.
//! 제출은 자동 재시도하지 않는다. 실패 시 운영자가 명시적으로 다시 제출한다.

use async_trait::async_trait;
use autoscan_core::error::CoreError;
use autoscan_core::models::submission::{SubmissionReceipt, SubmissionRequest};
use autoscan_core::ports::api_client::InspectionApi;
use std::sync::Arc;
use tracing::{debug, info};

use crate::http_client::HttpTransport;

/// 점검 제출 HTTP 클라이언트
pub struct HttpInspectionClient {
    transport: Arc<HttpTransport>,
}

impl HttpInspectionClient {
    /// 새 클라이언트 생성
    pub fn new(transport: Arc<HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl InspectionApi for HttpInspectionClient {
    async fn submit_inspection(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionReceipt, CoreError> {
        debug!(
            "점검 제출 요청: vehicle_id={}, images={}",
            request.vehicle_id,
            request.images.len()
        );

        let req = self
            .transport
            .request(reqwest::Method::POST, "/v1/inspections")
            .json(request);
        let resp = self.transport.send(req, "점검 제출").await?;
        let receipt: SubmissionReceipt = resp
            .json()
            .await
            .map_err(|e| CoreError::Internal(format!("제출 응답 파싱 실패: {e}")))?;

        info!(
            "점검 제출 성공: inspection_id={}, status={}",
            receipt.inspection_id, receipt.status
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autoscan_core::models::segment::SegmentId;
    use autoscan_core::models::submission::SubmissionImage;
    use mockito::Matcher;
    use std::time::Duration;

    fn client(url: &str) -> HttpInspectionClient {
        let transport = HttpTransport::new(url, Some("tok".to_string()), Duration::from_secs(5))
            .unwrap()
            .with_initial_backoff(Duration::from_millis(5));
        HttpInspectionClient::new(Arc::new(transport))
    }

    fn request() -> SubmissionRequest {
        SubmissionRequest {
            vehicle_id: "VIN123".to_string(),
            images: vec![
                SubmissionImage {
                    segment_id: SegmentId::new("front"),
                    uri: "https://cdn.example/front.jpg".to_string(),
                },
                SubmissionImage {
                    segment_id: SegmentId::new("rear"),
                    uri: "https://cdn.example/rear.jpg".to_string(),
                },
            ],
            video_uri: "https://cdn.example/session.mjpeg".to_string(),
        }
    }

    #[tokio::test]
    async fn submit_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/inspections")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "vehicle_id": "VIN123",
                "images": [
                    {"segment_id": "front", "uri": "https://cdn.example/front.jpg"},
                    {"segment_id": "rear", "uri": "https://cdn.example/rear.jpg"}
                ],
                "video_uri": "https://cdn.example/session.mjpeg"
            })))
            .with_status(202)
            .with_header("content-type", "application/json")
            .with_body(r#"{"inspection_id":"insp_42","status":"queued"}"#)
            .create_async()
            .await;

        let receipt = client(&server.url())
            .submit_inspection(&request())
            .await
            .unwrap();
        assert_eq!(receipt.inspection_id, "insp_42");
        assert_eq!(receipt.status, "queued");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn submit_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/inspections")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let result = client(&server.url()).submit_inspection(&request()).await;
        assert!(matches!(result, Err(CoreError::ServiceUnavailable(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        let result = client("http://127.0.0.1:1").submit_inspection(&request()).await;
        assert!(matches!(result, Err(CoreError::Network(_))));
    }

    #[tokio::test]
    async fn malformed_response_is_internal_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/inspections")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let result = client(&server.url()).submit_inspection(&request()).await;
        assert!(matches!(result, Err(CoreError::Internal(_))));
    }
}
