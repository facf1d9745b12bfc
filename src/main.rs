//! # 타임시트 서버 진입점
//!
//! 직원의 작업 시간 타이머와 주간 타임시트 승인 흐름을 제공하는 HTTP 서버입니다.
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 데이터베이스 연결 풀 생성
//! 4. 데이터베이스 마이그레이션과 레거시 데이터 이관
//! 5. 서비스(타이머 엔진, 엔트리, 워크플로) 조립
//! 6. API 라우터 설정
//! 7. HTTP 서버 시작

// ── 모듈 선언 ──
mod clock;
mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use axum::{
    routing::{get, patch, post, put},
    Router,
};
use clock::{Clock, SystemClock};
use config::Config;
use routes::*;
use services::{
    calendar::LocalCalendar,
    entries::EntryService,
    events::{EventSink, TracingEventSink},
    timer::TimerEngine,
    workflow::TimesheetWorkflow,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅(tracing) 초기화 ──
    // RUST_LOG가 없으면 timesheet, tower_http, axum 모듈을 debug 레벨로 설정
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timesheet=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = Config::from_env()?;
    tracing::info!(
        "Starting timesheet server on {}:{} (timezone offset {} min)",
        config.host,
        config.port,
        config.timezone_offset_minutes
    );

    // ── 4단계: SQLite 연결 풀 생성 ──
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // ── 5단계: 마이그레이션 ──
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    // 예전 JSON 활동 로그에 묻혀 있던 누적 시간을 정식 컬럼으로 옮깁니다.
    // 이미 옮긴 행은 activity_log가 비워져 있으므로 재시작해도 다시 처리되지 않습니다.
    let migrated = db::time_entries::migrate_legacy_durations(&pool).await?;
    if migrated > 0 {
        tracing::info!("Migrated accumulated time of {} legacy entries", migrated);
    }

    // ── 6단계: 서비스 조립 ──
    // 모든 서비스가 같은 시계와 같은 달력(시간대)을 공유해야
    // 엔트리 날짜와 주 경계 계산이 서로 어긋나지 않습니다.
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let calendar = LocalCalendar::from_offset_minutes(config.timezone_offset_minutes);
    let events: Arc<dyn EventSink> = Arc::new(TracingEventSink);

    let state = AppState {
        pool: pool.clone(),
        jwt_secret: config.jwt_secret.clone(),
        clock: clock.clone(),
        timer: Arc::new(TimerEngine::new(pool.clone(), clock.clone(), calendar)),
        entries: Arc::new(EntryService::new(pool.clone(), clock.clone(), calendar)),
        workflow: Arc::new(TimesheetWorkflow::new(pool.clone(), clock, calendar, events)),
    };

    // ── 7단계: API 라우터 설정 ──
    // axum 0.8부터 경로 파라미터는 `{id}` 문법을 씁니다.
    let timer_routes = Router::new()
        .route("/timer", get(get_timer))
        .route("/timer/start", post(start_timer))
        .route("/timer/pause", post(pause_timer))
        .route("/timer/resume", post(resume_timer))
        .route("/timer/stop", post(stop_timer))
        .route("/timer/discard", post(discard_timer))
        .route("/entries/{id}/continue", post(continue_entry));

    let entry_routes = Router::new()
        .route("/entries", get(list_entries).post(create_entry))
        .route(
            "/entries/{id}",
            patch(update_entry).delete(delete_entry),
        )
        .route("/entries/{id}/proof", post(attach_proof));

    // 고정 경로(`/pending`)는 파라미터 경로보다 우선 매칭됩니다.
    let timesheet_routes = Router::new()
        .route("/timesheets", get(list_my_timesheets))
        .route("/timesheets/pending", get(list_pending_timesheets))
        .route("/timesheets/{week_start}", get(get_timesheet))
        .route("/timesheets/{week_start}/validation", get(validate_timesheet))
        .route("/timesheets/{week_start}/submit", post(submit_timesheet))
        .route(
            "/timesheets/{employee_id}/{week_start}/approve",
            post(approve_timesheet),
        )
        .route(
            "/timesheets/{employee_id}/{week_start}/reject",
            post(reject_timesheet),
        )
        .route(
            "/timesheets/{employee_id}/{week_start}/lock",
            post(lock_timesheet),
        );

    let api_routes = Router::new()
        .merge(timer_routes)
        .merge(entry_routes)
        .merge(timesheet_routes)
        .route("/categories", get(list_categories))
        .route("/categories/{id}", put(upsert_category))
        .route("/health", get(health_check))
        .with_state(state);

    // ── 8단계: CORS 미들웨어 설정 ──
    // 웹 UI는 별도 서버에서 호스팅되므로 다른 출처의 호출을 허용합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // ── 9단계: 서버 시작 ──
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
