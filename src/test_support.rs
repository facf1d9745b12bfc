//! 테스트 공용 도우미: 마이그레이션된 인메모리 DB와 고정된 시각/엔트리

use crate::models::{EntryStatus, TimeEntry};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// 연결이 하나뿐인 인메모리 SQLite 풀.
/// 연결이 닫히면 DB가 사라지므로 idle/lifetime 제한을 끕니다.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    pool
}

/// 2026-10-12 (월) 08:00 UTC
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 12, 8, 0, 0).unwrap()
}

/// `t0()`가 속한 주의 월요일
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()
}

/// DRAFT 상태의 청구 가능 엔트리
pub fn entry(user_id: &str, category_id: &str, date: NaiveDate, minutes: i64) -> TimeEntry {
    TimeEntry {
        id: uuid::Uuid::now_v7().to_string(),
        user_id: user_id.to_string(),
        project_id: "P1".to_string(),
        category_id: category_id.to_string(),
        date,
        start_time: None,
        end_time: None,
        accumulated_seconds: 0,
        duration_minutes: minutes,
        is_billable: true,
        status: EntryStatus::Draft,
        description: String::new(),
        has_proof: false,
        proof_ref: None,
        created_at: t0(),
        updated_at: t0(),
    }
}
