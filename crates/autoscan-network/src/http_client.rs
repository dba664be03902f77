//! HTTP 공통 클라이언트.
//!
//! Bearer 토큰 주입, 상태 코드별 에러 매핑, exponential backoff 재시도.
//! 자산/영상 업로드와 점검 제출 어댑터가 공유한다.

use autoscan_core::error::CoreError;
use std::time::Duration;
use tracing::warn;

/// 기본 재시도 횟수
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// 첫 재시도 대기
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// 재시도 대기 상한
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry-After 헤더가 없을 때 기본 대기 (초)
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// 재시도 가능한 에러인지 판별
pub fn is_retryable(error: &CoreError) -> bool {
    error.is_transient()
}

/// 처리 서비스 HTTP 전송 계층
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    max_retries: u32,
    initial_backoff: Duration,
}

impl HttpTransport {
    /// 새 전송 계층 생성
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: INITIAL_BACKOFF,
        })
    }

    /// 재시도 횟수 설정
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 첫 재시도 대기 설정
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// 기본 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 재시도 횟수
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Authorization 헤더가 포함된 요청 빌더 반환
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.request(method, &url);
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// 요청 전송 (연결 실패/타임아웃 → Network)
    pub async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response, CoreError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("{what} 요청 실패: {e}")))?;
        check_response(resp).await
    }

    /// 재시도가 포함된 요청 실행
    ///
    /// exponential backoff: 1s → 2s → 4s (상한 30s)
    pub async fn execute_with_retry<F, Fut, T>(&self, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut delay = self.initial_backoff;

        for attempt in 0..self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if is_retryable(&e) => {
                    warn!(
                        "요청 실패 (시도 {}/{}): {e}, {delay:?} 후 재시도",
                        attempt + 1,
                        self.max_retries + 1
                    );

                    // RateLimit의 경우 서버 지정 대기 시간 사용
                    let wait = match &e {
                        CoreError::RateLimit { retry_after_secs } => {
                            Duration::from_secs(*retry_after_secs).min(MAX_BACKOFF)
                        }
                        _ => delay,
                    };
                    tokio::time::sleep(wait).await;
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
                Err(e) => return Err(e),
            }
        }

        operation().await
    }
}

/// 응답 상태 코드 확인 및 에러 매핑
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CoreError> {
    let status = resp.status();

    if status.is_success() {
        return Ok(resp);
    }

    let retry_after = resp
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

    let text = resp.text().await.unwrap_or_else(|e| {
        warn!("응답 본문 읽기 실패: {e}");
        String::new()
    });

    match status.as_u16() {
        401 => Err(CoreError::Auth(format!("인증 실패: {text}"))),
        404 => Err(CoreError::NotFound {
            resource_type: "API".to_string(),
            id: text,
        }),
        429 => Err(CoreError::RateLimit {
            retry_after_secs: retry_after,
        }),
        503 => Err(CoreError::ServiceUnavailable(text)),
        _ => Err(CoreError::Internal(format!("API 에러 ({status}): {text}"))),
    }
}
