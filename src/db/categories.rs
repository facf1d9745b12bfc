//! # 카테고리 쿼리 모듈
//!
//! 카테고리마다 증빙/메모 요구 여부가 저장되어 있고,
//! `load_policy`가 이를 읽어 `ProofPolicy` 값으로 만듭니다.

use crate::error::AppError;
use crate::models::{Category, UpsertCategoryRequest};
use crate::services::proof_policy::ProofPolicy;
use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite}; // Executor: 풀(&SqlitePool)과 트랜잭션(&mut *tx) 양쪽을 받는 트레이트

/// 모든 카테고리를 이름순으로 조회합니다.
pub async fn list<'e, E>(executor: E) -> Result<Vec<Category>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    // query_as::<_, Category>: 결과 행을 Category 구조체로 자동 매핑
    //   첫 번째 `_`는 DB 종류(Sqlite)로, 컴파일러가 executor에서 추론합니다.
    // r#"..."#: 여러 줄 SQL을 이스케이프 없이 쓰기 위한 raw 문자열
    let categories = sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, requires_proof, requires_notes, created_at, updated_at
        FROM categories
        ORDER BY name
        "#,
    )
    .fetch_all(executor) // 모든 행을 Vec으로
    .await?; // DB 에러는 From 변환으로 AppError::Storage가 됩니다.

    Ok(categories)
}

pub async fn get<'e, E>(executor: E, id: &str) -> Result<Option<Category>, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let category = sqlx::query_as::<_, Category>(
        r#"
        SELECT id, name, requires_proof, requires_notes, created_at, updated_at
        FROM categories
        WHERE id = ?
        "#,
    )
    // `?` 자리에 값을 바인딩합니다. 문자열을 SQL에 이어 붙이지 않으므로 SQL 인젝션이 불가능합니다.
    .bind(id)
    .fetch_optional(executor) // 0행이면 None, 1행이면 Some
    .await?;

    Ok(category)
}

/// 카테고리를 생성하거나 덮어씁니다.
pub async fn upsert<'e, E>(
    executor: E,
    id: &str,
    req: &UpsertCategoryRequest,
    now: DateTime<Utc>,
) -> Result<(), AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO categories (id, name, requires_proof, requires_notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (id) DO UPDATE SET
            name = excluded.name,
            requires_proof = excluded.requires_proof,
            requires_notes = excluded.requires_notes,
            updated_at = excluded.updated_at
        "#,
        // ↑ SQL 설명:
        //   ON CONFLICT (id): 같은 id가 이미 있으면 INSERT 대신 UPDATE
        //   excluded.*: INSERT하려던 새 값. created_at은 목록에 없으므로 처음 값이 유지됩니다.
    )
    .bind(id)
    .bind(&req.name)
    .bind(req.requires_proof)
    .bind(req.requires_notes)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

/// 현재 카테고리 설정으로 증빙 정책을 만듭니다.
pub async fn load_policy<'e, E>(executor: E) -> Result<ProofPolicy, AppError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let categories = list(executor).await?;
    Ok(ProofPolicy::from_categories(&categories))
}
