//! 애플리케이션 설정 구조체.
//!
//! 서버 URL, 저장 전략, 검증 임계값, 분석 해상도, 세그먼트 정의 등
//! 런타임 설정을 정의한다. `ConfigManager`를 통해 JSON 파일에서 로드.
//!
//! 검증 임계값은 경험적으로 조정된 기본값이며 카메라/조명 환경별로
//! 다시 조정할 수 있다.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;
use crate::models::segment::{MaskSpec, SegmentDefinition, SegmentId};

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 처리 서비스 연결 설정
    pub server: ServerConfig,
    /// 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// 검증 게이트/스케줄 설정
    #[serde(default)]
    pub capture: CaptureConfig,
    /// 프레임 분석/스틸 인코딩 설정
    #[serde(default)]
    pub vision: VisionConfig,
    /// 세션 레코더 설정
    #[serde(default)]
    pub recorder: RecorderConfig,
    /// 촬영 세그먼트 정의 (순서대로)
    #[serde(default = "default_segments")]
    pub segments: Vec<SegmentDefinition>,
}

// ============================================================
// 서버 설정
// ============================================================

/// 처리 서비스 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API 서버 기본 URL (예: "https://api.example.com")
    pub base_url: String,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Bearer 토큰 (인증 흐름은 외부에서 처리)
    #[serde(default)]
    pub api_token: Option<String>,
    /// 일시적 실패 재시도 횟수 (업로드 전용, 제출은 재시도하지 않음)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

// ============================================================
// 저장소 설정
// ============================================================

/// 스틸/영상 저장 전략
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageStrategy {
    /// 기기 로컬 저장 (네트워크 송신 없음)
    #[default]
    Local,
    /// 처리 서비스 오브젝트 저장소
    Remote,
}

/// 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 데이터 디렉토리 (None이면 플랫폼 기본 경로)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// 저장 전략
    #[serde(default)]
    pub strategy: StorageStrategy,
    /// SQLite 캡처 저널 사용 여부
    #[serde(default = "default_true")]
    pub journal_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            strategy: StorageStrategy::Local,
            journal_enabled: true,
        }
    }
}

// ============================================================
// 검증 게이트 설정
// ============================================================

/// 검증 게이트 임계값 + 샘플링 스케줄
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// 최소 정렬 점수
    #[serde(default = "default_min_score")]
    pub min_score: f32,
    /// 최소 밝기
    #[serde(default = "default_min_brightness")]
    pub min_brightness: f32,
    /// 최대 밝기
    #[serde(default = "default_max_brightness")]
    pub max_brightness: f32,
    /// 최대 움직임
    #[serde(default = "default_max_motion")]
    pub max_motion: f32,
    /// 최근 점수 표준편차 상한
    #[serde(default = "default_max_score_stddev")]
    pub max_score_stddev: f32,
    /// 검증에 필요한 연속 통과 수
    #[serde(default = "default_required_consecutive")]
    pub required_consecutive: u32,
    /// 점수 이력 길이
    #[serde(default = "default_history_len")]
    pub history_len: usize,
    /// 표준편차 검사를 시작하는 최소 이력 수
    #[serde(default = "default_consistency_min_samples")]
    pub consistency_min_samples: usize,
    /// 분석 틱 간격 (밀리초)
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// 세그먼트 전환 후 분석 시작 지연 (밀리초)
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,
    /// 검증 후 다음 세그먼트로 넘어가기 전 대기 (밀리초)
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    /// 마지막 세그먼트 후 자산 준비 확인 재시도 횟수
    #[serde(default = "default_readiness_retries")]
    pub readiness_retries: u32,
    /// 자산 준비 확인 간격 (밀리초)
    #[serde(default = "default_readiness_backoff_ms")]
    pub readiness_backoff_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            min_brightness: default_min_brightness(),
            max_brightness: default_max_brightness(),
            max_motion: default_max_motion(),
            max_score_stddev: default_max_score_stddev(),
            required_consecutive: default_required_consecutive(),
            history_len: default_history_len(),
            consistency_min_samples: default_consistency_min_samples(),
            sample_interval_ms: default_sample_interval_ms(),
            startup_delay_ms: default_startup_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            readiness_retries: default_readiness_retries(),
            readiness_backoff_ms: default_readiness_backoff_ms(),
        }
    }
}

impl CaptureConfig {
    /// 분석 틱 간격
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// 세그먼트 전환 후 시작 지연
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// 검증 후 전환 대기
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// 자산 준비 확인 간격
    pub fn readiness_backoff(&self) -> Duration {
        Duration::from_millis(self.readiness_backoff_ms)
    }
}

// ============================================================
// 비전 설정
// ============================================================

/// 스틸 이미지 인코딩 포맷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StillFormat {
    /// JPEG (기본값)
    #[default]
    Jpeg,
    /// WebP
    Webp,
}

impl StillFormat {
    /// MIME 타입
    pub fn content_type(self) -> &'static str {
        match self {
            StillFormat::Jpeg => "image/jpeg",
            StillFormat::Webp => "image/webp",
        }
    }

    /// 파일 확장자
    pub fn extension(self) -> &'static str {
        match self {
            StillFormat::Jpeg => "jpg",
            StillFormat::Webp => "webp",
        }
    }
}

/// 프레임 분석 + 스틸 인코딩 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// 분석 작업 해상도 너비
    #[serde(default = "default_working_width")]
    pub working_width: u32,
    /// 분석 작업 해상도 높이
    #[serde(default = "default_working_height")]
    pub working_height: u32,
    /// Sobel 에지 판정 임계값 (그래디언트 크기)
    #[serde(default = "default_edge_threshold")]
    pub edge_threshold: f32,
    /// 마스크 내부 판정 알파 임계값 (0-255, 약 4%)
    #[serde(default = "default_mask_alpha_threshold")]
    pub mask_alpha_threshold: u8,
    /// 움직임 샘플링 간격 (픽셀)
    #[serde(default = "default_motion_stride")]
    pub motion_stride: u32,
    /// 스틸 이미지 포맷
    #[serde(default)]
    pub still_format: StillFormat,
    /// 스틸 이미지 품질 (1-100)
    #[serde(default = "default_still_quality")]
    pub still_quality: u8,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            working_width: default_working_width(),
            working_height: default_working_height(),
            edge_threshold: default_edge_threshold(),
            mask_alpha_threshold: default_mask_alpha_threshold(),
            motion_stride: default_motion_stride(),
            still_format: StillFormat::Jpeg,
            still_quality: default_still_quality(),
        }
    }
}

// ============================================================
// 레코더 설정
// ============================================================

/// 세션 레코더 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// 청크 길이 (밀리초)
    #[serde(default = "default_chunk_ms")]
    pub chunk_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            chunk_ms: default_chunk_ms(),
        }
    }
}

impl RecorderConfig {
    /// 청크 길이
    pub fn chunk_interval(&self) -> Duration {
        Duration::from_millis(self.chunk_ms)
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://localhost:8000".to_string(),
                request_timeout_ms: default_request_timeout_ms(),
                api_token: None,
                max_retries: default_max_retries(),
            },
            storage: StorageConfig::default(),
            capture: CaptureConfig::default(),
            vision: VisionConfig::default(),
            recorder: RecorderConfig::default(),
            segments: default_segments(),
        }
    }

    /// 서버 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// 설정 일관성 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        let c = &self.capture;
        for (field, value) in [
            ("capture.min_score", c.min_score),
            ("capture.min_brightness", c.min_brightness),
            ("capture.max_brightness", c.max_brightness),
            ("capture.max_motion", c.max_motion),
            ("capture.max_score_stddev", c.max_score_stddev),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(field, "0.0 ~ 1.0 범위여야 함"));
            }
        }
        if c.min_brightness > c.max_brightness {
            return Err(invalid(
                "capture.min_brightness",
                "max_brightness보다 클 수 없음",
            ));
        }
        if c.required_consecutive == 0 {
            return Err(invalid("capture.required_consecutive", "1 이상이어야 함"));
        }
        if c.history_len == 0 || c.consistency_min_samples > c.history_len {
            return Err(invalid(
                "capture.history_len",
                "consistency_min_samples 이상이어야 함",
            ));
        }
        if c.sample_interval_ms == 0 {
            return Err(invalid("capture.sample_interval_ms", "0일 수 없음"));
        }

        let v = &self.vision;
        if v.working_width < 3 || v.working_height < 3 {
            return Err(invalid("vision.working_width", "3x3 이상이어야 함"));
        }
        if v.motion_stride == 0 {
            return Err(invalid("vision.motion_stride", "1 이상이어야 함"));
        }
        if !(1..=100).contains(&v.still_quality) {
            return Err(invalid("vision.still_quality", "1 ~ 100 범위여야 함"));
        }
        if self.recorder.chunk_ms == 0 {
            return Err(invalid("recorder.chunk_ms", "0일 수 없음"));
        }

        if self.segments.is_empty() {
            return Err(invalid("segments", "세그먼트가 하나 이상 필요함"));
        }
        let mut seen = HashSet::new();
        for segment in &self.segments {
            if !seen.insert(segment.id.clone()) {
                return Err(invalid("segments", &format!("중복 ID: {}", segment.id)));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> CoreError {
    CoreError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

// ============================================================
// 기본 세그먼트 (10개 촬영 지점)
// ============================================================

/// 기본 촬영 세그먼트: 정면에서 시작해 시계 방향으로 차량을 한 바퀴 돈다
pub fn default_segments() -> Vec<SegmentDefinition> {
    let front = vec![
        [0.12, 0.35],
        [0.88, 0.35],
        [0.95, 0.55],
        [0.92, 0.80],
        [0.08, 0.80],
        [0.05, 0.55],
    ];
    let fender = vec![
        [0.10, 0.30],
        [0.75, 0.28],
        [0.92, 0.50],
        [0.90, 0.82],
        [0.15, 0.85],
        [0.08, 0.55],
    ];
    let front_door = vec![[0.10, 0.22], [0.90, 0.22], [0.92, 0.85], [0.08, 0.85]];
    let rear_door = vec![[0.08, 0.25], [0.88, 0.22], [0.92, 0.85], [0.10, 0.85]];
    let quarter = vec![
        [0.08, 0.30],
        [0.70, 0.26],
        [0.92, 0.45],
        [0.92, 0.82],
        [0.10, 0.84],
    ];
    let rear = vec![
        [0.15, 0.32],
        [0.85, 0.32],
        [0.93, 0.55],
        [0.90, 0.82],
        [0.10, 0.82],
        [0.07, 0.55],
    ];

    vec![
        segment("front", "Front", "Stand centered in front of the vehicle so the bumper and headlights fill the outline.", front),
        segment("right_front_fender", "Right front fender", "Move to the right front corner and frame the fender and wheel arch.", fender.clone()),
        segment("right_front_door", "Right front door", "Step back along the right side and frame the front door.", front_door.clone()),
        segment("right_rear_door", "Right rear door", "Walk toward the rear and frame the right rear door.", rear_door.clone()),
        segment("right_rear_quarter", "Right rear quarter", "Frame the right rear quarter panel and wheel.", quarter.clone()),
        segment("rear", "Rear", "Stand centered behind the vehicle so the bumper and tail lights fill the outline.", rear),
        segment("left_rear_quarter", "Left rear quarter", "Frame the left rear quarter panel and wheel.", mirror(&quarter)),
        segment("left_rear_door", "Left rear door", "Walk toward the front and frame the left rear door.", mirror(&rear_door)),
        segment("left_front_door", "Left front door", "Frame the left front door.", mirror(&front_door)),
        segment("left_front_fender", "Left front fender", "Finish at the left front corner and frame the fender and wheel arch.", mirror(&fender)),
    ]
}

fn segment(id: &str, label: &str, instruction: &str, points: Vec<[f32; 2]>) -> SegmentDefinition {
    SegmentDefinition {
        id: SegmentId::new(id),
        label: label.to_string(),
        instruction: instruction.to_string(),
        mask: MaskSpec::Polygon { points },
    }
}

/// 좌우 반전 (반대편 세그먼트용)
fn mirror(points: &[[f32; 2]]) -> Vec<[f32; 2]> {
    points.iter().map(|[x, y]| [1.0 - x, *y]).collect()
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_max_retries() -> u32 {
    3
}
fn default_min_score() -> f32 {
    0.40
}
fn default_min_brightness() -> f32 {
    0.15
}
fn default_max_brightness() -> f32 {
    0.85
}
fn default_max_motion() -> f32 {
    0.20
}
fn default_max_score_stddev() -> f32 {
    0.15
}
fn default_required_consecutive() -> u32 {
    12
}
fn default_history_len() -> usize {
    5
}
fn default_consistency_min_samples() -> usize {
    3
}
fn default_sample_interval_ms() -> u64 {
    800
}
fn default_startup_delay_ms() -> u64 {
    300
}
fn default_settle_delay_ms() -> u64 {
    2_000
}
fn default_readiness_retries() -> u32 {
    5
}
fn default_readiness_backoff_ms() -> u64 {
    500
}
fn default_working_width() -> u32 {
    192
}
fn default_working_height() -> u32 {
    144
}
fn default_edge_threshold() -> f32 {
    60.0
}
fn default_mask_alpha_threshold() -> u8 {
    10 // 약 4%
}
fn default_motion_stride() -> u32 {
    4
}
fn default_still_quality() -> u8 {
    85
}
fn default_chunk_ms() -> u64 {
    1_000
}
