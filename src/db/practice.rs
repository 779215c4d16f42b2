//! # 연습 점수 쿼리 모듈
//!
//! `practice_scores` 테이블. 답안 목록은 JSON 문자열 컬럼입니다.

use crate::error::AppError;
use crate::models::*;
use sqlx::SqlitePool;

pub async fn insert_practice_score(pool: &SqlitePool, record: &PracticeScore) -> Result<(), AppError> {
    let answers = serde_json::to_string(&record.answers)?;

    sqlx::query(
        r#"
        INSERT INTO practice_scores (id, user_id, quiz_id, quiz_title, score, total_points,
                                     correct_count, total_questions, answers, completed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(&record.quiz_id)
    .bind(&record.quiz_title)
    .bind(i64::from(record.score))
    .bind(i64::from(record.total_points))
    .bind(record.correct_count as i64)
    .bind(record.total_questions as i64)
    .bind(answers)
    .bind(record.completed_at)
    .execute(pool)
    .await?;

    Ok(())
}

const PRACTICE_COLUMNS: &str = "id, user_id, quiz_id, quiz_title, score, total_points, \
                                correct_count, total_questions, answers, completed_at";

pub async fn get_practice_score(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<PracticeScore>, AppError> {
    let sql = format!("SELECT {PRACTICE_COLUMNS} FROM practice_scores WHERE id = ?");
    let row = sqlx::query_as::<_, PracticeScoreRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(PracticeScore::try_from).transpose()?)
}

/// 사용자의 연습 기록 (최신순). 같은 시각이면 나중에 저장된 것이 먼저입니다.
pub async fn list_practice_scores(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<PracticeScore>, AppError> {
    let sql = format!(
        "SELECT {PRACTICE_COLUMNS} FROM practice_scores \
         WHERE user_id = ? ORDER BY completed_at DESC, rowid DESC"
    );
    let rows = sqlx::query_as::<_, PracticeScoreRow>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    let records = rows
        .into_iter()
        .map(PracticeScore::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}
