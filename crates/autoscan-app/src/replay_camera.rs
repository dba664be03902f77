//! 리플레이 카메라.
//!
//! 디렉터리의 이미지 파일을 실시간 카메라 피드처럼 재생한다.
//! `FrameSource`는 호출마다 다음 프레임을 돌려주고(순환),
//! `VideoSource`는 현재 프레임을 JPEG로 인코딩해 MJPEG 청크로 내보낸다.

use async_trait::async_trait;
use autoscan_core::error::CoreError;
use autoscan_core::models::frame::CameraFrame;
use autoscan_core::ports::camera::{FrameSource, VideoSource};
use autoscan_vision::encoder::encode_jpeg;
use autoscan_vision::resize::resize_rgba;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// MJPEG 청크 MIME 타입
pub const MJPEG_CONTENT_TYPE: &str = "video/x-motion-jpeg";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp"];

/// 리플레이 카메라
pub struct ReplayCamera {
    frames: Vec<Arc<CameraFrame>>,
    cursor: Mutex<usize>,
    recording: AtomicBool,
    chunk_quality: u8,
}

impl ReplayCamera {
    /// 메모리 프레임으로 생성
    pub fn from_frames(frames: Vec<CameraFrame>, chunk_quality: u8) -> Result<Self, CoreError> {
        if frames.is_empty() {
            return Err(CoreError::Media("재생할 프레임 없음".to_string()));
        }
        if let Some(bad) = frames.iter().find(|f| !f.is_well_formed()) {
            return Err(CoreError::InvalidFrame(format!(
                "{}x{} 프레임 버퍼 길이 불일치",
                bad.width, bad.height
            )));
        }
        Ok(Self {
            frames: frames.into_iter().map(Arc::new).collect(),
            cursor: Mutex::new(0),
            recording: AtomicBool::new(false),
            chunk_quality,
        })
    }

    /// 디렉터리 이미지로 생성 (파일명 순, 너비가 `max_width`를 넘으면 축소)
    pub fn from_dir(dir: &Path, max_width: u32, chunk_quality: u8) -> Result<Self, CoreError> {
        let paths = list_images(dir)?;
        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            match load_frame(path, max_width) {
                Ok(frame) => frames.push(frame),
                Err(e) => warn!("프레임 로드 실패, 건너뜀: {} ({e})", path.display()),
            }
        }
        info!(
            "리플레이 카메라: {}개 프레임 ({})",
            frames.len(),
            dir.display()
        );
        Self::from_frames(frames, chunk_quality)
    }

    /// 녹화 중인지
    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    fn next_frame(&self) -> Arc<CameraFrame> {
        let mut cursor = self.cursor.lock();
        let frame = self.frames[*cursor % self.frames.len()].clone();
        *cursor = (*cursor + 1) % self.frames.len();
        frame
    }

    fn peek_frame(&self) -> Arc<CameraFrame> {
        let cursor = *self.cursor.lock();
        self.frames[cursor % self.frames.len()].clone()
    }
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

fn load_frame(path: &Path, max_width: u32) -> Result<CameraFrame, CoreError> {
    let image = image::open(path)
        .map_err(|e| CoreError::InvalidFrame(format!("이미지 디코딩 실패: {e}")))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    let rgba = image.into_raw();

    if max_width == 0 || width <= max_width {
        return Ok(CameraFrame::new(width, height, rgba));
    }

    let scaled_height = ((height as u64 * max_width as u64) / width as u64).max(1) as u32;
    let resized = resize_rgba(width, height, &rgba, max_width, scaled_height)?;
    debug!(
        "프레임 축소: {} {}x{} → {}x{}",
        path.display(),
        width,
        height,
        max_width,
        scaled_height
    );
    Ok(CameraFrame::new(max_width, scaled_height, resized))
}

#[async_trait]
impl FrameSource for ReplayCamera {
    async fn current_frame(&self) -> Result<CameraFrame, CoreError> {
        let frame = self.next_frame();
        Ok(CameraFrame::new(frame.width, frame.height, frame.rgba.clone()))
    }
}

#[async_trait]
impl VideoSource for ReplayCamera {
    async fn start(&self) -> Result<(), CoreError> {
        if self.recording.swap(true, Ordering::SeqCst) {
            return Err(CoreError::Media("이미 녹화 중".to_string()));
        }
        debug!("리플레이 녹화 시작");
        Ok(())
    }

    async fn read_chunk(&self) -> Result<Vec<u8>, CoreError> {
        if !self.is_recording() {
            return Err(CoreError::Media("녹화 중이 아님".to_string()));
        }
        let frame = self.peek_frame();
        let quality = self.chunk_quality;
        tokio::task::spawn_blocking(move || {
            encode_jpeg(frame.width, frame.height, &frame.rgba, quality)
        })
        .await
        .map_err(|e| CoreError::Internal(format!("MJPEG 인코딩 작업 실패: {e}")))?
    }

    async fn stop(&self) -> Result<(), CoreError> {
        self.recording.store(false, Ordering::SeqCst);
        debug!("리플레이 녹화 정지");
        Ok(())
    }

    fn content_type(&self) -> &str {
        MJPEG_CONTENT_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn solid(width: u32, height: u32, value: u8) -> CameraFrame {
        CameraFrame::new(width, height, vec![value; (width * height * 4) as usize])
    }

    #[test]
    fn rejects_empty_and_malformed() {
        assert!(ReplayCamera::from_frames(vec![], 80).is_err());
        let bad = CameraFrame::new(4, 4, vec![0; 10]);
        assert!(matches!(
            ReplayCamera::from_frames(vec![bad], 80),
            Err(CoreError::InvalidFrame(_))
        ));
    }

    #[tokio::test]
    async fn frames_cycle_in_order() {
        let camera =
            ReplayCamera::from_frames(vec![solid(2, 2, 10), solid(2, 2, 20)], 80).unwrap();
        let values: Vec<u8> = [
            camera.current_frame().await.unwrap(),
            camera.current_frame().await.unwrap(),
            camera.current_frame().await.unwrap(),
        ]
        .iter()
        .map(|f| f.rgba[0])
        .collect();
        assert_eq!(values, vec![10, 20, 10]);
    }

    #[tokio::test]
    async fn chunks_are_jpeg_while_recording() {
        let camera = ReplayCamera::from_frames(vec![solid(16, 16, 90)], 70).unwrap();
        assert!(camera.read_chunk().await.is_err());

        camera.start().await.unwrap();
        assert!(camera.start().await.is_err());
        let chunk = camera.read_chunk().await.unwrap();
        assert_eq!(&chunk[..2], &[0xFF, 0xD8]);
        assert_eq!(camera.content_type(), MJPEG_CONTENT_TYPE);

        camera.stop().await.unwrap();
        assert!(!camera.is_recording());
    }

    #[test]
    fn loads_sorted_images_and_downscales() {
        let dir = TempDir::new().unwrap();
        image::RgbaImage::from_pixel(64, 32, image::Rgba([200, 0, 0, 255]))
            .save(dir.path().join("b.png"))
            .unwrap();
        image::RgbaImage::from_pixel(16, 16, image::Rgba([0, 200, 0, 255]))
            .save(dir.path().join("a.png"))
            .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let camera = ReplayCamera::from_dir(dir.path(), 32, 80).unwrap();
        assert_eq!(camera.frames.len(), 2);
        let first = camera.next_frame();
        assert_eq!((first.width, first.height), (16, 16));
        let second = camera.next_frame();
        assert_eq!((second.width, second.height), (32, 16));
    }

    #[test]
    fn empty_dir_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(ReplayCamera::from_dir(dir.path(), 0, 80).is_err());
    }
}
