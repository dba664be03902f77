//! 스키마 마이그레이션.
//!
//! 버전 기반 SQLite 스키마 관리.

use rusqlite::Connection;
use tracing::{debug, info};

/// 현재 스키마 버전
pub const CURRENT_VERSION: u32 = 2;

/// 스키마 마이그레이션 실행
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current = get_version(conn)?;
    info!("현재 스키마 버전: {current}, 목표: {CURRENT_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// 현재 스키마 버전 조회
pub fn get_version(conn: &Connection) -> Result<u32, rusqlite::Error> {
    let result: Result<u32, _> = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    );
    result.or(Ok(0))
}

/// V1: 캡처 세션 + 세그먼트 자산
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V1 실행: capture_sessions + capture_assets 테이블");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS capture_sessions (
            session_id TEXT PRIMARY KEY,
            vehicle_id TEXT NOT NULL,
            started_at TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- 세그먼트당 1행 (삽입 전용)
        CREATE TABLE IF NOT EXISTS capture_assets (
            session_id TEXT NOT NULL REFERENCES capture_sessions(session_id),
            segment_id TEXT NOT NULL,
            storage_location TEXT NOT NULL,
            uri TEXT NOT NULL,
            recorded_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (session_id, segment_id)
        );

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )?;

    Ok(())
}

/// V2: 제출 결과 (세션당 1회)
fn migrate_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("마이그레이션 V2 실행: submissions 테이블");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS submissions (
            session_id TEXT PRIMARY KEY REFERENCES capture_sessions(session_id),
            inspection_id TEXT NOT NULL,
            status TEXT NOT NULL,
            submitted_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_submissions_inspection ON submissions(inspection_id);

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )?;

    Ok(())
}
