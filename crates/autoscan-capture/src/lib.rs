//! # autoscan-capture
//!
//! 가이드 다중 세그먼트 캡처 파이프라인.
//!
//! 차량 주위 열 개 촬영 지점을 순서대로 안내하고, 프레임마다 정렬 점수를
//! 계산해 지점이 맞춰진 순간 스틸 이미지를 저장한 뒤 다음 지점으로 넘어간다.
//! 세션 전체를 연속 녹화하며, 모든 지점이 저장되면 점검 요청을 제출한다.
//!
//! ## 구조
//!
//! - [`sequencer`]: 세그먼트 순서/상태 관리
//! - [`gate`]: 연속 통과 기반 검증 판정
//! - [`recorder`]: 청크 단위 세션 녹화
//! - [`submission`]: 자산 확인, 영상 업로드, 점검 제출
//! - [`engine`]: 단일 이벤트 루프 (`tokio::select!`)
//! - [`error`]: 파이프라인 에러 + 복구 동작

pub mod engine;
pub mod error;
pub mod gate;
pub mod recorder;
pub mod sequencer;
pub mod submission;

pub use engine::{CaptureEngine, EngineCommand, EngineHandle, EnginePorts, EngineSnapshot};
pub use error::{CaptureError, RecoveryAction};
