//! 작업 해상도 다운스케일.
//!
//! fast_image_resize 기반 고속 리사이즈 + 휘도 평면 변환.

use autoscan_core::error::CoreError;
use fast_image_resize::{images::Image as FirImage, PixelType, ResizeAlg, ResizeOptions, Resizer};
use tracing::debug;

/// 분석용 작업 프레임 (휘도 0.0 ~ 255.0, 행 우선)
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingFrame {
    /// 너비
    pub width: u32,
    /// 높이
    pub height: u32,
    /// 휘도 평면
    pub luma: Vec<f32>,
}

impl WorkingFrame {
    /// RGBA 버퍼에서 휘도 평면 생성 (BT.601 가중치)
    pub fn from_rgba(width: u32, height: u32, rgba: &[u8]) -> Result<Self, CoreError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(CoreError::InvalidFrame(format!(
                "버퍼 길이 불일치: {} != {expected}",
                rgba.len()
            )));
        }
        let luma = rgba
            .chunks_exact(4)
            .map(|px| 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32)
            .collect();
        Ok(Self {
            width,
            height,
            luma,
        })
    }

    /// 평균 밝기 (0.0 ~ 1.0)
    pub fn mean_brightness(&self) -> f32 {
        if self.luma.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.luma.iter().map(|&v| v as f64).sum();
        (sum / self.luma.len() as f64 / 255.0) as f32
    }
}

/// RGBA 버퍼 고속 리사이즈
///
/// 동일 크기면 복제 반환.
pub fn resize_rgba(
    src_w: u32,
    src_h: u32,
    rgba: &[u8],
    width: u32,
    height: u32,
) -> Result<Vec<u8>, CoreError> {
    if src_w == 0 || src_h == 0 {
        return Err(CoreError::InvalidFrame("소스 이미지 크기 0".to_string()));
    }
    if width == 0 || height == 0 {
        return Err(CoreError::Internal("목표 이미지 크기 0".to_string()));
    }
    if src_w == width && src_h == height {
        return Ok(rgba.to_vec());
    }

    let src_image = FirImage::from_vec_u8(src_w, src_h, rgba.to_vec(), PixelType::U8x4)
        .map_err(|e| CoreError::InvalidFrame(format!("소스 이미지 생성 실패: {e}")))?;
    let mut dst_image = FirImage::new(width, height, PixelType::U8x4);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| CoreError::Internal(format!("리사이즈 실패: {e}")))?;

    debug!("리사이즈: {}x{} → {}x{}", src_w, src_h, width, height);
    Ok(dst_image.into_vec())
}

/// 카메라 RGBA 프레임을 작업 해상도 휘도 평면으로 변환
pub fn downscale_to_working(
    src_w: u32,
    src_h: u32,
    rgba: &[u8],
    width: u32,
    height: u32,
) -> Result<WorkingFrame, CoreError> {
    let expected = src_w as usize * src_h as usize * 4;
    if rgba.len() != expected {
        return Err(CoreError::InvalidFrame(format!(
            "{}x{} 프레임 버퍼 길이 불일치: {} != {expected}",
            src_w,
            src_h,
            rgba.len()
        )));
    }
    let resized = resize_rgba(src_w, src_h, rgba, width, height)?;
    WorkingFrame::from_rgba(width, height, &resized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
        rgba.repeat((w * h) as usize)
    }

    #[test]
    fn downscale_to_working_size() {
        let buf = solid(640, 480, [128, 128, 128, 255]);
        let frame = downscale_to_working(640, 480, &buf, 192, 144).unwrap();
        assert_eq!((frame.width, frame.height), (192, 144));
        assert_eq!(frame.luma.len(), 192 * 144);
        assert!((frame.mean_brightness() - 128.0 / 255.0).abs() < 0.02);
    }

    #[test]
    fn same_size_noop() {
        let buf = solid(4, 4, [10, 20, 30, 255]);
        let resized = resize_rgba(4, 4, &buf, 4, 4).unwrap();
        assert_eq!(resized, buf);
    }

    #[test]
    fn luma_weights() {
        let frame = WorkingFrame::from_rgba(1, 1, &[255, 0, 0, 255]).unwrap();
        assert!((frame.luma[0] - 0.299 * 255.0).abs() < 1e-3);
        let white = WorkingFrame::from_rgba(1, 1, &[255, 255, 255, 255]).unwrap();
        assert!((white.mean_brightness() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn truncated_buffer_error() {
        let result = downscale_to_working(4, 4, &[0; 10], 2, 2);
        assert!(matches!(result, Err(CoreError::InvalidFrame(_))));
    }

    #[test]
    fn zero_size_source_error() {
        assert!(resize_rgba(0, 10, &[], 5, 5).is_err());
    }
}
