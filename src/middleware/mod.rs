//! # 미들웨어 모듈
//!
//! - `auth`: Bearer JWT를 검증해 `AuthUser`를 만드는 Axum Extractor

pub mod auth;
