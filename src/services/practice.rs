//! # 연습(learning) 모드
//!
//! 로그인한 사용자가 라이브 세션 없이 혼자 퀴즈를 풉니다.
//! 채점은 라이브 게임과 같은 평가기(`evaluator`)를 쓰고, 세션 엔진은 거치지 않습니다.
//!
//! - 풀이 시작: 정답을 뺀 문제 목록
//! - 제출: 한 번에 모든 답안을 채점해 `practice_scores`에 기록
//! - 기록/통계/결과 조회: 본인 기록만

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::models::*;
use crate::services::evaluator::{evaluate, points_for};

/// 연습할 수 있는 퀴즈를 불러옵니다. 공개되지 않은 퀴즈는 `Forbidden`
async fn practicable_quiz(pool: &SqlitePool, quiz_id: &str) -> Result<Quiz, AppError> {
    let quiz = db::get_quiz(pool, quiz_id)
        .await?
        .ok_or(AppError::NotFound("quiz"))?;

    if db::is_quiz_discoverable(pool, quiz_id).await? != Some(true) {
        tracing::debug!(quiz_id, "quiz is hidden from practice");
        return Err(AppError::Forbidden(
            "This quiz is not available for practice".to_string(),
        ));
    }
    Ok(quiz)
}

/// 풀이 화면용 퀴즈 (정답 제외)
pub async fn start(pool: &SqlitePool, quiz_id: &str) -> Result<PracticeQuiz, AppError> {
    let quiz = practicable_quiz(pool, quiz_id).await?;
    Ok(PracticeQuiz::from(&quiz))
}

/// 답안 목록을 채점합니다.
///
/// 퀴즈에 없는 문제의 답안은 건너뛰고, 같은 문제에 답안이 여러 개면 첫 답안만 채점합니다.
/// 결과의 답안 순서는 제출 순서를 따릅니다.
pub fn grade(
    quiz: &Quiz,
    user_id: &str,
    id: String,
    answers: Vec<PracticeAnswerInput>,
    now: DateTime<Utc>,
) -> PracticeScore {
    let mut seen = HashSet::new();
    let mut graded = Vec::new();

    for input in answers {
        let Some(question) = input
            .question_id
            .as_deref()
            .and_then(|qid| quiz.question(qid.trim()))
        else {
            continue;
        };
        if !seen.insert(question.id.clone()) {
            continue;
        }

        let is_correct = evaluate(question, input.value.as_ref());
        graded.push(PracticeAnswer {
            question_id: question.id.clone(),
            question: question.question.clone(),
            question_type: question.question_type,
            options: question.options.clone(),
            user_answer: input.value,
            correct_answer: question.correct_answer.clone(),
            is_correct,
            explanation: question.explanation.clone(),
            points: question.points,
            points_awarded: points_for(question, is_correct),
            time_spent: input
                .time_spent
                .filter(|t| t.is_finite() && *t >= 0.0)
                .unwrap_or(0.0),
        });
    }

    PracticeScore {
        id,
        user_id: user_id.to_string(),
        quiz_id: quiz.id.clone(),
        quiz_title: quiz.title.clone(),
        score: graded.iter().map(|a| a.points_awarded).sum(),
        total_points: quiz.total_points(),
        correct_count: graded.iter().filter(|a| a.is_correct).count(),
        total_questions: quiz.questions.len(),
        answers: graded,
        completed_at: now,
    }
}

/// 답안을 채점하고 기록을 저장합니다.
pub async fn submit(
    pool: &SqlitePool,
    user_id: &str,
    quiz_id: &str,
    answers: Vec<PracticeAnswerInput>,
) -> Result<PracticeScore, AppError> {
    let quiz = practicable_quiz(pool, quiz_id).await?;

    let record = grade(
        &quiz,
        user_id,
        uuid::Uuid::now_v7().to_string(),
        answers,
        Utc::now(),
    );
    db::insert_practice_score(pool, &record).await?;

    tracing::info!(
        practice_id = %record.id,
        quiz_id,
        user_id,
        score = record.score,
        total_points = record.total_points,
        "practice submitted"
    );
    Ok(record)
}

pub async fn history(pool: &SqlitePool, user_id: &str) -> Result<PracticeHistory, AppError> {
    let records = db::list_practice_scores(pool, user_id).await?;
    let history: Vec<PracticeSummary> = records.iter().map(PracticeSummary::from).collect();
    Ok(PracticeHistory {
        count: history.len(),
        history,
    })
}

/// 기록 목록(순서 무관)으로 통계를 계산합니다. 최고 기록은 득점률 기준이며,
/// 득점률이 같으면 먼저 완료한 기록을 유지합니다.
pub fn summarize(records: &[PracticeScore]) -> PracticeStats {
    let mut ordered: Vec<&PracticeScore> = records.iter().collect();
    ordered.sort_by_key(|r| r.completed_at);

    let total_score: u32 = ordered.iter().map(|r| r.score).sum();
    let total_points: u32 = ordered.iter().map(|r| r.total_points).sum();

    // 분수 비교는 교차 곱으로: a/b > c/d ⇔ a·d > c·b (만점 0은 득점률 0)
    let ratio_beats = |a: &PracticeScore, b: &PracticeScore| {
        let lhs = u64::from(a.score) * u64::from(b.total_points.max(1));
        let rhs = u64::from(b.score) * u64::from(a.total_points.max(1));
        a.total_points > 0 && (b.total_points == 0 || lhs > rhs)
    };
    let best = ordered.iter().copied().fold(None, |best: Option<&PracticeScore>, current| {
        match best {
            Some(b) if !ratio_beats(current, b) => Some(b),
            _ => Some(current),
        }
    });

    PracticeStats {
        total_quizzes_completed: ordered.len(),
        total_score,
        total_points,
        average_percentage: percentage(total_score, total_points),
        best_quiz_score: best.map_or(0, |b| b.score),
        best_quiz_percentage: best.map_or(0, PracticeScore::percentage),
    }
}

pub async fn stats(pool: &SqlitePool, user_id: &str) -> Result<PracticeStats, AppError> {
    let records = db::list_practice_scores(pool, user_id).await?;
    Ok(summarize(&records))
}

/// 결과 상세 (본인 기록만)
pub async fn result(
    pool: &SqlitePool,
    user_id: &str,
    id: &str,
) -> Result<PracticeReview, AppError> {
    let record = db::get_practice_score(pool, id)
        .await?
        .ok_or(AppError::NotFound("result"))?;

    if record.user_id != user_id {
        return Err(AppError::Forbidden("Not authorized".to_string()));
    }
    Ok(PracticeReview::from(record))
}
