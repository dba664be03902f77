//! 카메라 프레임 모델.

use chrono::{DateTime, Utc};

/// 카메라에서 받은 한 장의 프레임 (RGBA8, 행 우선)
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// 프레임 너비 (픽셀)
    pub width: u32,
    /// 프레임 높이 (픽셀)
    pub height: u32,
    /// RGBA 바이트 (width * height * 4 이어야 유효)
    pub rgba: Vec<u8>,
    /// 캡처 시각
    pub captured_at: DateTime<Utc>,
}

impl CameraFrame {
    /// 새 프레임 생성
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Self {
        Self {
            width,
            height,
            rgba,
            captured_at: Utc::now(),
        }
    }

    /// 해상도 기준 기대 버퍼 길이
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    /// 버퍼 길이와 해상도가 일치하는지
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.rgba.len() == self.expected_len()
    }
}
