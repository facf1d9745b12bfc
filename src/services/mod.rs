//! # 비즈니스 로직 계층
//!
//! 라우트 핸들러와 DB 계층 사이에서 상태 전이 규칙을 강제합니다.
//!
//! - `timer`: 타이머 엔진 (start / pause / resume / stop)
//! - `workflow`: 주간 타임시트 워크플로 (submit / approve / reject / lock)
//! - `entries`: 수동 엔트리 편집과 증빙 첨부
//! - `proof_policy`: 카테고리별 증빙/메모 요구 판정
//! - `calendar`: 로컬 날짜와 주 경계 계산
//! - `events`: 워크플로 이벤트 발행
//! - `locks`: 키별 직렬화 잠금

pub mod calendar;
pub mod entries;
pub mod events;
pub mod locks;
pub mod proof_policy;
pub mod timer;
pub mod workflow;
