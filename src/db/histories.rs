//! # 게임 기록 쿼리 모듈
//!
//! 게임 종료 시 생성되는 기록을 저장하고 조회합니다.
//! 기록은 한 번 쓰이면 수정되지 않으므로 UPDATE 쿼리가 없습니다.
//!
//! ## 테이블 구조
//! - `game_histories`: 기록 본문 (`player_results`는 JSON 문자열)
//! - `history_participants`: 로그인 참가자 → 기록 인덱스 ("내 게임" 조회용)

use crate::error::AppError;
use crate::models::*;
use sqlx::SqlitePool;

/// 게임 기록을 저장합니다.
///
/// 본문과 참가자 인덱스를 하나의 트랜잭션으로 씁니다.
/// 실패하면 아무것도 남지 않으므로 호출자는 그대로 재시도할 수 있습니다.
pub async fn insert_history(pool: &SqlitePool, record: &HistoryRecord) -> Result<(), AppError> {
    let player_results = serde_json::to_string(&record.player_results)?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO game_histories (id, host_id, quiz_id, quiz_title, pin, player_results,
                                    total_players, started_at, ended_at, completed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.host_id)
    .bind(&record.quiz_id)
    .bind(&record.quiz_title)
    .bind(&record.pin)
    .bind(player_results)
    .bind(record.total_players as i64)
    .bind(record.started_at)
    .bind(record.ended_at)
    .bind(record.completed_at)
    .execute(&mut *tx)
    .await?;

    for user_id in record
        .player_results
        .iter()
        .filter_map(|p| p.user_id.as_deref())
    {
        sqlx::query(
            "INSERT OR IGNORE INTO history_participants (history_id, user_id) VALUES (?, ?)",
        )
        .bind(&record.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

const HISTORY_COLUMNS: &str = "h.id, h.host_id, h.quiz_id, h.quiz_title, h.pin, h.player_results, \
                               h.total_players, h.started_at, h.ended_at, h.completed_at";

pub async fn get_history(pool: &SqlitePool, id: &str) -> Result<Option<HistoryRecord>, AppError> {
    let sql = format!("SELECT {HISTORY_COLUMNS} FROM game_histories h WHERE h.id = ?");
    let row = sqlx::query_as::<_, HistoryRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    // Option<Result<..>> → Result<Option<..>>: transpose()로 뒤집습니다.
    Ok(row.map(HistoryRecord::try_from).transpose()?)
}

/// 호스트로 진행한 게임 기록 (최신순)
pub async fn list_histories_for_host(
    pool: &SqlitePool,
    host_id: &str,
) -> Result<Vec<HistoryRecord>, AppError> {
    let sql = format!(
        "SELECT {HISTORY_COLUMNS} FROM game_histories h \
         WHERE h.host_id = ? ORDER BY h.completed_at DESC"
    );
    let rows = sqlx::query_as::<_, HistoryRow>(&sql)
        .bind(host_id)
        .fetch_all(pool)
        .await?;

    rows_to_records(rows)
}

/// 참가자로 플레이한 게임 기록 (최신순)
pub async fn list_histories_for_participant(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<HistoryRecord>, AppError> {
    let sql = format!(
        "SELECT {HISTORY_COLUMNS} FROM game_histories h \
         JOIN history_participants hp ON hp.history_id = h.id \
         WHERE hp.user_id = ? ORDER BY h.completed_at DESC"
    );
    let rows = sqlx::query_as::<_, HistoryRow>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    rows_to_records(rows)
}

fn rows_to_records(rows: Vec<HistoryRow>) -> Result<Vec<HistoryRecord>, AppError> {
    let records = rows
        .into_iter()
        .map(HistoryRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}
