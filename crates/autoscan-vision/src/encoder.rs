//! 스틸 이미지 인코더.
//!
//! 검증된 세그먼트 프레임을 JPEG(기본) 또는 WebP로 인코딩.
//! 리플레이 카메라의 MJPEG 청크도 같은 JPEG 경로를 사용한다.

use autoscan_core::config::StillFormat;
use autoscan_core::error::CoreError;
use autoscan_core::models::frame::CameraFrame;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, RgbaImage};
use tracing::debug;

/// 인코딩 결과
#[derive(Debug, Clone)]
pub struct EncodedStill {
    /// 인코딩된 바이트
    pub bytes: Vec<u8>,
    /// MIME 타입
    pub content_type: &'static str,
}

/// 카메라 프레임을 스틸 이미지로 인코딩
pub fn encode_still(
    frame: &CameraFrame,
    format: StillFormat,
    quality: u8,
) -> Result<EncodedStill, CoreError> {
    if !frame.is_well_formed() {
        return Err(CoreError::InvalidFrame(format!(
            "{}x{} 프레임 버퍼 길이 불일치: {}",
            frame.width,
            frame.height,
            frame.rgba.len()
        )));
    }

    let bytes = match format {
        StillFormat::Jpeg => encode_jpeg(frame.width, frame.height, &frame.rgba, quality)?,
        StillFormat::Webp => encode_webp(frame.width, frame.height, &frame.rgba, quality),
    };

    debug!(
        "스틸 인코딩: {}x{} → {} bytes ({}, 품질 {})",
        frame.width,
        frame.height,
        bytes.len(),
        format.content_type(),
        quality
    );

    Ok(EncodedStill {
        bytes,
        content_type: format.content_type(),
    })
}

/// RGBA 버퍼를 JPEG로 인코딩 (알파 제거)
pub fn encode_jpeg(width: u32, height: u32, rgba: &[u8], quality: u8) -> Result<Vec<u8>, CoreError> {
    let image = RgbaImage::from_raw(width, height, rgba.to_vec())
        .ok_or_else(|| CoreError::InvalidFrame("RGBA 이미지 생성 실패".to_string()))?;
    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100))
        .encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| CoreError::Media(format!("JPEG 인코딩 실패: {e}")))?;
    Ok(bytes)
}

/// RGBA 버퍼를 WebP로 인코딩
pub fn encode_webp(width: u32, height: u32, rgba: &[u8], quality: u8) -> Vec<u8> {
    let encoder = webp::Encoder::from_rgba(rgba, width, height);
    encoder.encode(quality.clamp(1, 100) as f32).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_frame(w: u32, h: u32) -> CameraFrame {
        let mut rgba = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                rgba.extend_from_slice(&[(x * 4) as u8, (y * 4) as u8, 128, 255]);
            }
        }
        CameraFrame::new(w, h, rgba)
    }

    #[test]
    fn jpeg_has_soi_marker() {
        let still = encode_still(&gradient_frame(64, 48), StillFormat::Jpeg, 85).unwrap();
        assert_eq!(still.content_type, "image/jpeg");
        assert_eq!(&still.bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&still.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn webp_has_riff_header() {
        let still = encode_still(&gradient_frame(64, 48), StillFormat::Webp, 75).unwrap();
        assert_eq!(still.content_type, "image/webp");
        assert_eq!(&still.bytes[..4], b"RIFF");
        assert_eq!(&still.bytes[8..12], b"WEBP");
    }

    #[test]
    fn malformed_frame_rejected() {
        let frame = CameraFrame::new(10, 10, vec![0; 12]);
        assert!(matches!(
            encode_still(&frame, StillFormat::Jpeg, 85),
            Err(CoreError::InvalidFrame(_))
        ));
    }
}
