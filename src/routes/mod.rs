//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들을 모아둔 모듈입니다.
//! Axum에서 핸들러는 HTTP 요청을 받아 응답을 반환하는 async 함수입니다.
//!
//! 각 하위 모듈:
//! - `categories`: 카테고리(증빙 정책) 조회/설정
//! - `entries`: 작업 시간 기록 조회/수동 입력/수정/삭제/증빙 첨부
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `timer`: 타이머 start / pause / resume / stop
//! - `timesheets`: 주간 타임시트 검증/제출/승인/반려/잠금

pub mod categories;
pub mod entries;
pub mod health;
pub mod timer;
pub mod timesheets;

pub use categories::*;
pub use entries::*;
pub use health::*;
pub use timer::*;
pub use timesheets::*;

use crate::services::{entries::EntryService, timer::TimerEngine, workflow::TimesheetWorkflow};
use crate::clock::Clock;
use sqlx::SqlitePool;
use std::sync::Arc;

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// 서비스들은 `Arc`로 감싸져 있어 clone해도 같은 인스턴스(같은 잠금 테이블)를 공유합니다.
#[derive(Clone)]
pub struct AppState {
    /// SQLite 연결 풀 (내부적으로 Arc로 공유)
    pub pool: SqlitePool,
    /// JWT 서명 검증용 비밀키
    pub jwt_secret: String,
    pub clock: Arc<dyn Clock>,
    pub timer: Arc<TimerEngine>,
    pub entries: Arc<EntryService>,
    pub workflow: Arc<TimesheetWorkflow>,
}
