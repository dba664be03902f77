//! AUTOSCAN 도메인 모델.
//!
//! 캡처 파이프라인과 외부 처리 서비스가 공유하는 데이터 구조체를 정의한다.

pub mod asset;
pub mod frame;
pub mod sample;
pub mod segment;
pub mod session;
pub mod submission;
