//! # QuizRush 라이브 퀴즈 서버
//!
//! 호스트가 퀴즈로 게임 세션을 열면 플레이어가 6자리 PIN으로 참가하고,
//! 문제를 함께 풀며 실시간으로 점수를 겨루는 백엔드입니다.
//!
//! 라이브러리 크레이트로 분리해 두어 `main.rs`와 통합 테스트(`tests/`)가
//! 같은 라우터를 사용합니다.
//!
//! 모듈 구성:
//! - `config`: 환경변수 설정
//! - `db`: SQLite 접근 (퀴즈 카탈로그, 게임 기록, 연습 점수)
//! - `error`: 공통 에러 타입과 HTTP 응답 변환
//! - `middleware`: JWT 인증, JSON 본문 추출기
//! - `models`: 데이터 구조체
//! - `routes`: HTTP 핸들러
//! - `services`: 게임 엔진, 채점기, 세션 저장소, 이벤트 버스, 연습 모드

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::services::events::EventBus;
use crate::services::game::{GameEngine, GameSettings};
use crate::services::session_store::InMemorySessionStore;

/// 모든 핸들러가 공유하는 상태
///
/// `SqlitePool`과 `GameEngine`은 내부가 `Arc`이므로 clone해도 같은 자원을 가리킵니다.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub engine: GameEngine,
    pub jwt_secret: String,
}

impl AppState {
    /// 메모리 세션 저장소와 새 이벤트 버스로 상태를 만듭니다.
    pub fn new(pool: SqlitePool, jwt_secret: String, settings: GameSettings) -> Self {
        let engine = GameEngine::new(
            pool.clone(),
            Arc::new(InMemorySessionStore::new()),
            EventBus::new(),
            settings,
        );
        Self {
            pool,
            engine,
            jwt_secret,
        }
    }
}

/// `/api/v1` 아래에 모든 API를 묶은 라우터
pub fn router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/sessions", post(routes::create_session))
        .route("/sessions/join", post(routes::join_session))
        // axum 0.8부터 경로 파라미터는 `{id}` 문법입니다.
        .route(
            "/sessions/{id}",
            get(routes::get_session).delete(routes::close_session),
        )
        .route("/sessions/{id}/start", post(routes::start_game))
        .route("/sessions/{id}/save-draft", post(routes::save_draft))
        .route("/sessions/{id}/submit", post(routes::submit_answer))
        .route("/sessions/{id}/advance", post(routes::advance_question))
        .route("/sessions/{id}/end", post(routes::end_game))
        .route("/sessions/{id}/leave", post(routes::leave_session))
        .route("/sessions/{id}/events", get(routes::session_events));

    let api_routes = Router::new()
        .merge(session_routes)
        .route("/history/me", get(routes::my_history))
        .route("/history/{id}", get(routes::get_history))
        .route("/learning/start/{quiz_id}", post(routes::start_learning))
        .route("/learning/submit", post(routes::submit_learning))
        .route("/learning/history", get(routes::learning_history))
        .route("/learning/stats", get(routes::learning_stats))
        .route("/learning/{id}", get(routes::learning_result))
        .route("/health", get(routes::health_check))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
