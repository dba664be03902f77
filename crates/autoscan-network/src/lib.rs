//! # autoscan-network
//!
//! 처리 서비스 HTTP 어댑터.
//! - [`http_client`]: 공통 요청/재시도/상태 코드 매핑
//! - [`asset_client`]: 원격 오브젝트 저장소 (`AssetStore` + `VideoStore` 포트)
//! - [`inspection_client`]: 점검 요청 제출 (`InspectionApi` 포트)

pub mod asset_client;
pub mod http_client;
pub mod inspection_client;
