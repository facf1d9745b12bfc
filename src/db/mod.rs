//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 서비스 계층(services/)이 이 모듈의 함수를 조합해 상태 전이를 수행합니다.
//!
//! 각 하위 모듈:
//! - `categories`: 카테고리와 증빙 정책 로딩
//! - `time_entries`: 작업 시간 기록(Time Entry Store)
//! - `timers`: 사용자별 진행 중 타이머
//! - `timesheets`: 주간 타임시트
//!
//! 함수 이름이 모듈 간에 겹치므로(`get`, `list` 등) 재공개하지 않고
//! `db::time_entries::get`처럼 모듈 경로로 호출합니다.

pub mod categories;
pub mod time_entries;
pub mod timers;
pub mod timesheets;
