//! 비전(프레임 평가) 포트.
//!
//! 구현: `autoscan-vision` crate (`AlignmentAnalyzer`)

use crate::models::frame::CameraFrame;
use crate::models::sample::AlignmentSample;
use crate::models::segment::Segment;

/// 프레임 평가기: 카메라 프레임을 활성 세그먼트 마스크에 대해 점수화.
///
/// 실패는 에러 대신 0 샘플로 표현한다. 캡처 엔진이 소유권을 가진 채
/// 블로킹 스레드로 옮겨 실행하므로 `Send`만 요구한다.
pub trait FrameScorer: Send {
    /// 프레임 한 장 평가
    fn score(&mut self, frame: &CameraFrame, segment: &Segment) -> AlignmentSample;

    /// 세그먼트 전환 시 내부 상태(이전 프레임 등) 초기화
    fn reset(&mut self);
}
