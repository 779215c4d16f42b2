//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! SQLite와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 라이브 세션 상태는 메모리(`services::session_store`)에 있고,
//! 여기서는 오래 남는 데이터만 다룹니다.
//!
//! 각 하위 모듈:
//! - `quizzes`: 퀴즈 카탈로그 조회, 공개 여부 토글
//! - `histories`: 게임 기록 저장과 조회
//! - `practice`: 연습 모드 점수 저장과 조회

pub mod histories;
pub mod practice;
pub mod quizzes;

pub use histories::*;
pub use practice::*;
pub use quizzes::*;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// 연결 풀을 만들고 마이그레이션을 적용합니다.
///
/// `sqlite::memory:`는 연결마다 별도 DB가 생기므로, 테스트에서는
/// `max_connections = 1`로 호출해 하나의 메모리 DB를 공유합니다.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
