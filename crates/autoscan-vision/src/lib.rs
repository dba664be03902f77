//! # autoscan-vision
//!
//! 프레임 정렬 분석 크레이트.
//! 라이브 카메라 프레임을 작업 해상도로 줄이고, 세그먼트 마스크 안의
//! 에지 밀도/강도, 밝기, 움직임을 계산해 [`AlignmentSample`]을 만든다.
//! 검증 후 스틸 이미지 인코딩(JPEG/WebP)도 담당한다.
//!
//! [`AlignmentSample`]: autoscan_core::models::sample::AlignmentSample

pub mod analyzer;
pub mod encoder;
pub mod mask;
pub mod resize;
