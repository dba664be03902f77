//! # autoscan-storage
//!
//! 로컬 저장소 어댑터.
//! - [`asset_store`]: 세그먼트 스틸/세션 영상 파일 저장 (`AssetStore` + `VideoStore` 포트)
//! - [`journal`]: SQLite 캡처 저널 (`CaptureJournal` 포트)
//! - [`migration`]: 저널 스키마 마이그레이션

pub mod asset_store;
pub mod journal;
pub mod migration;
