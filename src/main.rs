//! # QuizRush 웹 서버 진입점
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 연결 풀 생성 + 마이그레이션
//! 4. 게임 엔진과 라우터 구성
//! 5. 만료 세션 정리 작업(sweeper) 시작
//! 6. HTTP 서버 시작

use std::time::Duration;

use anyhow::Result; // anyhow::Result: 어떤 에러 타입이든 담을 수 있는 범용 Result 타입
use quizrush::{config::Config, db, router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt}; // 로깅 초기화 유틸리티

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .ok()로 .env 파일이 없어도 에러 없이 넘어갑니다.
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅(tracing) 초기화 ──
    // RUST_LOG가 없으면 quizrush, tower_http, axum 모듈을 debug 레벨로 설정
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizrush=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = Config::from_env()?;
    tracing::info!("Starting QuizRush server on {}:{}", config.host, config.port);

    // ── 4단계: SQLite 연결 풀 + 마이그레이션 ──
    let pool = db::connect(&config.database_url, 5).await?;

    // ── 5단계: 애플리케이션 상태(State) 생성 ──
    // 라이브 세션은 이 프로세스의 메모리에만 있습니다.
    let state = AppState::new(pool, config.jwt_secret.clone(), config.game_settings());

    // ── 6단계: 만료 세션 정리 작업 ──
    // tokio::spawn: 백그라운드 태스크로 실행합니다. 서버와 같은 런타임을 공유합니다.
    let engine = state.engine.clone();
    let sweep_every = Duration::from_secs(config.sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_every);
        // 첫 tick은 즉시 완료되므로 건너뜁니다.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let expired = engine.sweep_expired().await;
            if expired > 0 {
                tracing::info!(expired, "swept idle sessions");
            }
        }
    });

    // ── 7단계: 서버 시작 ──
    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
