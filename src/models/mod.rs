//! # 데이터 모델 모듈
//!
//! 애플리케이션에서 사용하는 데이터 구조체(struct)들을 정의합니다.
//! 각 하위 모듈은 특정 도메인의 데이터 타입을 담당합니다:
//! - `category`: 작업 카테고리와 증빙 요구 플래그
//! - `time_entry`: 확정된 작업 시간 기록(TimeEntry)
//! - `timer`: 사용자별 타이머 상태(Idle / Running / Paused)
//! - `timesheet`: 주간 타임시트와 제출 검증 결과
//!
//! `pub use X::*;`로 재공개하여 `crate::models::TimeEntry`처럼 짧게 접근합니다.

pub mod category;
pub mod time_entry;
pub mod timer;
pub mod timesheet;

pub use category::*;
pub use time_entry::*;
pub use timer::*;
pub use timesheet::*;
