//! # 퀴즈 카탈로그 쿼리 모듈
//!
//! 퀴즈와 문제를 읽는 SQL 쿼리 함수들입니다. 퀴즈 작성/수정은 외부 도구가 맡고,
//! 이 서버는 세션을 만들 때 퀴즈를 읽어 스냅샷을 뜨기만 합니다.
//!
//! ## 테이블 구조
//! - `quizzes`: 퀴즈 기본 정보 + 공개(discoverable) 여부
//! - `questions`: 문제 목록 (`position` 순서). 보기/정답/허용 답안은 JSON 문자열 컬럼

use crate::error::AppError;
use crate::models::*;
use sqlx::SqlitePool;

/// 퀴즈 하나와 그 문제들을 순서대로 조회합니다.
///
/// 퀴즈가 없으면 `Ok(None)` — 라우트/엔진에서 `NotFound("quiz")`로 바뀝니다.
pub async fn get_quiz(pool: &SqlitePool, id: &str) -> Result<Option<Quiz>, AppError> {
    let quiz = sqlx::query_as::<_, QuizRow>(
        r#"
        SELECT id, title, description, created_by
        FROM quizzes
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    // let-else: None이면 바로 반환합니다.
    let Some(quiz) = quiz else {
        return Ok(None);
    };

    let rows = sqlx::query_as::<_, QuestionRow>(
        r#"
        SELECT id, question, question_type, options, correct_answer,
               accepted_answers, explanation, points, time_limit
        FROM questions
        WHERE quiz_id = ?
        ORDER BY position ASC
        "#,
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    // Result를 모아 collect하면 하나라도 실패할 때 첫 에러를 반환합니다.
    let questions = rows
        .into_iter()
        .map(question_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(Quiz {
        id: quiz.id,
        title: quiz.title,
        description: quiz.description,
        created_by: quiz.created_by,
        questions,
    }))
}

fn question_from_row(row: QuestionRow) -> Result<Question, AppError> {
    let question_type = QuestionType::parse(&row.question_type).ok_or_else(|| {
        AppError::Internal(format!(
            "Unknown question type '{}' on question {}",
            row.question_type, row.id
        ))
    })?;

    let correct_answer = match row.correct_answer.as_deref() {
        Some(raw) => serde_json::from_str::<Option<AnswerValue>>(raw)?,
        None => None,
    };

    Ok(Question {
        id: row.id,
        question: row.question,
        question_type,
        options: serde_json::from_str(&row.options)?,
        correct_answer,
        accepted_answers: serde_json::from_str(&row.accepted_answers)?,
        explanation: row.explanation,
        points: u32::try_from(row.points).unwrap_or(1).max(1),
        time_limit: u32::try_from(row.time_limit).unwrap_or(30),
    })
}

/// 퀴즈를 문제와 함께 저장합니다 (시드 데이터/테스트용).
///
/// 퀴즈와 문제를 하나의 트랜잭션으로 묶어, 중간에 실패하면 아무것도 남기지 않습니다.
pub async fn insert_quiz(pool: &SqlitePool, quiz: &Quiz) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO quizzes (id, title, description, created_by)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&quiz.id)
    .bind(&quiz.title)
    .bind(&quiz.description)
    .bind(&quiz.created_by)
    .execute(&mut *tx)
    .await?;

    for (position, question) in quiz.questions.iter().enumerate() {
        let correct_answer = question
            .correct_answer
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO questions (id, quiz_id, position, question, question_type, options,
                                   correct_answer, accepted_answers, explanation, points, time_limit)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&question.id)
        .bind(&quiz.id)
        .bind(position as i64)
        .bind(&question.question)
        .bind(question.question_type.as_str())
        .bind(serde_json::to_string(&question.options)?)
        .bind(correct_answer)
        .bind(serde_json::to_string(&question.accepted_answers)?)
        .bind(&question.explanation)
        .bind(i64::from(question.points))
        .bind(i64::from(question.time_limit))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// 퀴즈의 공개(검색 노출) 여부를 바꿉니다.
///
/// PIN이 살아 있는 동안 퀴즈를 숨기고, 세션이 끝나거나 정리되면 다시 공개합니다.
pub async fn set_quiz_discoverable(
    pool: &SqlitePool,
    id: &str,
    discoverable: bool,
) -> Result<(), AppError> {
    sqlx::query("UPDATE quizzes SET is_discoverable = ? WHERE id = ?")
        .bind(discoverable)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn is_quiz_discoverable(pool: &SqlitePool, id: &str) -> Result<Option<bool>, AppError> {
    let flag = sqlx::query_scalar::<_, bool>("SELECT is_discoverable FROM quizzes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(flag)
}
