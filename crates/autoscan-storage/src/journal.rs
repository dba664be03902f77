//! SQLite 캡처 저널.
//!
//! `CaptureJournal` 포트 구현. 세션 시작, 세그먼트 저장 참조, 제출 결과를 기록한다.
//! 제출은 세션당 한 번만 기록할 수 있다.

use async_trait::async_trait;
use autoscan_core::error::CoreError;
use autoscan_core::models::asset::StoredAssetReference;
use autoscan_core::models::segment::SegmentId;
use autoscan_core::models::session::CaptureSession;
use autoscan_core::models::submission::SubmissionReceipt;
use autoscan_core::ports::storage::CaptureJournal;
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::migration;

/// SQLite 캡처 저널
pub struct SqliteJournal {
    conn: Mutex<Connection>,
}

impl SqliteJournal {
    /// 파일 기반 저널 열기
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("SQLite 열기 실패: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            ",
        )
        .map_err(|e| CoreError::Storage(format!("PRAGMA 설정 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        info!("캡처 저널 초기화: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 인메모리 저널 생성 (테스트용)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("인메모리 SQLite 생성 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|e| CoreError::Internal(format!("잠금 획득 실패: {e}")))
    }

    /// 세션의 저장 참조 목록 (세그먼트 ID 순)
    pub fn session_assets(&self, session_id: &str) -> Result<Vec<StoredAssetReference>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT segment_id, storage_location, uri FROM capture_assets
                 WHERE session_id = ?1 ORDER BY segment_id",
            )
            .map_err(|e| CoreError::Storage(format!("쿼리 준비 실패: {e}")))?;

        let rows = stmt
            .query_map([session_id], |row| {
                Ok(StoredAssetReference {
                    segment_id: SegmentId::new(row.get::<_, String>(0)?),
                    storage_location: row.get(1)?,
                    uri: row.get(2)?,
                })
            })
            .map_err(|e| CoreError::Storage(format!("자산 조회 실패: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| CoreError::Storage(format!("자산 행 변환 실패: {e}")))
    }

    /// 세션의 제출 결과
    pub fn submission(&self, session_id: &str) -> Result<Option<SubmissionReceipt>, CoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT inspection_id, status FROM submissions WHERE session_id = ?1",
            [session_id],
            |row| {
                Ok(SubmissionReceipt {
                    inspection_id: row.get(0)?,
                    status: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(|e| CoreError::Storage(format!("제출 조회 실패: {e}")))
    }
}

#[async_trait]
impl CaptureJournal for SqliteJournal {
    async fn record_session(&self, session: &CaptureSession) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO capture_sessions (session_id, vehicle_id, started_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![
                session.session_id,
                session.vehicle_id,
                session.started_at.to_rfc3339()
            ],
        )
        .map_err(|e| CoreError::Storage(format!("세션 기록 실패: {e}")))?;

        debug!("세션 기록: {}", session.session_id);
        Ok(())
    }

    async fn record_asset(
        &self,
        session_id: &str,
        reference: &StoredAssetReference,
    ) -> Result<(), CoreError> {
        let conn = self.lock()?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO capture_assets (session_id, segment_id, storage_location, uri)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    session_id,
                    reference.segment_id.as_str(),
                    reference.storage_location,
                    reference.uri
                ],
            )
            .map_err(|e| CoreError::Storage(format!("자산 기록 실패: {e}")))?;

        if inserted == 0 {
            debug!("자산 이미 기록됨: {session_id}/{}", reference.segment_id);
        } else {
            debug!("자산 기록: {session_id}/{}", reference.segment_id);
        }
        Ok(())
    }

    async fn record_submission(
        &self,
        session_id: &str,
        receipt: &SubmissionReceipt,
    ) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO submissions (session_id, inspection_id, status) VALUES (?1, ?2, ?3)",
            rusqlite::params![session_id, receipt.inspection_id, receipt.status],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                CoreError::Validation {
                    field: "session_id".to_string(),
                    message: format!("이미 제출된 세션: {session_id}"),
                }
            }
            other => CoreError::Storage(format!("제출 기록 실패: {other}")),
        })?;

        info!("제출 기록: {session_id} → {}", receipt.inspection_id);
        Ok(())
    }

    async fn is_submitted(&self, session_id: &str) -> Result<bool, CoreError> {
        let conn = self.lock()?;
        let count: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM submissions WHERE session_id = ?1",
                [session_id],
                |row| row.get(0),
            )
            .map_err(|e| CoreError::Storage(format!("제출 조회 실패: {e}")))?;
        Ok(count > 0)
    }
}
