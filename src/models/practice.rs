//! # 연습(learning) 모드 모델
//!
//! 라이브 세션 없이 혼자 퀴즈를 풀고 남기는 점수 기록입니다.
//! 답안마다 채점 당시의 문제 내용(본문, 정답, 해설)을 함께 저장하므로
//! 나중에 퀴즈가 바뀌어도 결과 화면은 그대로입니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::answer::AnswerValue;
use super::quiz::{Question, QuestionType, Quiz};

/// 반올림한 백분율. 만점이 0이면 0입니다.
pub fn percentage(score: u32, total_points: u32) -> u32 {
    if total_points == 0 {
        return 0;
    }
    let (score, total) = (u64::from(score), u64::from(total_points));
    // 정수 연산으로 0.5 올림
    u32::try_from((score * 100 + total / 2) / total).unwrap_or(u32::MAX)
}

/// 정답이 빠진 문제 (풀이 화면용)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeQuestion {
    pub id: String,
    pub question: String,
    pub question_type: QuestionType,
    pub options: Vec<String>,
    pub points: u32,
    pub time_limit: u32,
}

impl From<&Question> for PracticeQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id.clone(),
            question: q.question.clone(),
            question_type: q.question_type,
            options: q.options.clone(),
            points: q.points,
            time_limit: q.time_limit,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeQuiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub total_questions: usize,
    pub questions: Vec<PracticeQuestion>,
}

impl From<&Quiz> for PracticeQuiz {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            total_questions: quiz.questions.len(),
            questions: quiz.questions.iter().map(PracticeQuestion::from).collect(),
        }
    }
}

/// 제출된 답안 하나. 라이브 제출과 같은 `value`를 쓰고, `answer`도 받습니다.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeAnswerInput {
    pub question_id: Option<String>,
    #[serde(default, alias = "answer")]
    pub value: Option<AnswerValue>,
    pub time_spent: Option<f64>,
}

/// `POST /api/v1/learning/submit`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPracticeRequest {
    pub quiz_id: Option<String>,
    pub answers: Option<Vec<PracticeAnswerInput>>,
}

/// 채점된 답안 (저장 형식)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeAnswer {
    pub question_id: String,
    pub question: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub user_answer: Option<AnswerValue>,
    pub correct_answer: Option<AnswerValue>,
    pub is_correct: bool,
    pub explanation: Option<String>,
    pub points: u32,
    pub points_awarded: u32,
    pub time_spent: f64,
}

/// 연습 한 판의 점수 기록
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeScore {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub score: u32,
    pub total_points: u32,
    pub correct_count: usize,
    pub total_questions: usize,
    pub answers: Vec<PracticeAnswer>,
    pub completed_at: DateTime<Utc>,
}

impl PracticeScore {
    pub fn percentage(&self) -> u32 {
        percentage(self.score, self.total_points)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PracticeScoreRow {
    pub id: String,
    pub user_id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub score: i64,
    pub total_points: i64,
    pub correct_count: i64,
    pub total_questions: i64,
    pub answers: String,
    pub completed_at: DateTime<Utc>,
}

impl TryFrom<PracticeScoreRow> for PracticeScore {
    type Error = serde_json::Error;

    fn try_from(row: PracticeScoreRow) -> Result<Self, Self::Error> {
        Ok(Self {
            answers: serde_json::from_str(&row.answers)?,
            id: row.id,
            user_id: row.user_id,
            quiz_id: row.quiz_id,
            quiz_title: row.quiz_title,
            score: u32::try_from(row.score).unwrap_or(0),
            total_points: u32::try_from(row.total_points).unwrap_or(0),
            correct_count: usize::try_from(row.correct_count).unwrap_or(0),
            total_questions: usize::try_from(row.total_questions).unwrap_or(0),
            completed_at: row.completed_at,
        })
    }
}

// ── 응답 본문 ──

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedAnswer {
    pub question_id: String,
    pub user_answer: Option<AnswerValue>,
    pub is_correct: bool,
}

/// 제출 직후 응답
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSubmitted {
    pub id: String,
    pub score: u32,
    pub total_points: u32,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub percentage: u32,
    pub answers: Vec<GradedAnswer>,
}

impl From<&PracticeScore> for PracticeSubmitted {
    fn from(record: &PracticeScore) -> Self {
        Self {
            id: record.id.clone(),
            score: record.score,
            total_points: record.total_points,
            correct_answers: record.correct_count,
            total_questions: record.total_questions,
            percentage: record.percentage(),
            answers: record
                .answers
                .iter()
                .map(|a| GradedAnswer {
                    question_id: a.question_id.clone(),
                    user_answer: a.user_answer.clone(),
                    is_correct: a.is_correct,
                })
                .collect(),
        }
    }
}

/// 연습 기록 목록의 한 줄
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSummary {
    pub id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub score: u32,
    pub total_points: u32,
    pub percentage: u32,
    pub completed_at: DateTime<Utc>,
}

impl From<&PracticeScore> for PracticeSummary {
    fn from(record: &PracticeScore) -> Self {
        Self {
            id: record.id.clone(),
            quiz_id: record.quiz_id.clone(),
            quiz_title: record.quiz_title.clone(),
            score: record.score,
            total_points: record.total_points,
            percentage: record.percentage(),
            completed_at: record.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeHistory {
    pub count: usize,
    pub history: Vec<PracticeSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeStats {
    pub total_quizzes_completed: usize,
    pub total_score: u32,
    pub total_points: u32,
    pub average_percentage: u32,
    pub best_quiz_score: u32,
    pub best_quiz_percentage: u32,
}

/// 결과 화면의 답안 (번호는 1부터)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedAnswer {
    pub question_number: usize,
    #[serde(flatten)]
    pub answer: PracticeAnswer,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeReview {
    pub id: String,
    pub quiz_id: String,
    pub quiz_title: String,
    pub score: u32,
    pub total_points: u32,
    pub percentage: u32,
    pub completed_at: DateTime<Utc>,
    pub answers: Vec<ReviewedAnswer>,
}

impl From<PracticeScore> for PracticeReview {
    fn from(record: PracticeScore) -> Self {
        let percentage = record.percentage();
        Self {
            answers: record
                .answers
                .into_iter()
                .enumerate()
                .map(|(idx, answer)| ReviewedAnswer {
                    question_number: idx + 1,
                    answer,
                })
                .collect(),
            id: record.id,
            quiz_id: record.quiz_id,
            quiz_title: record.quiz_title,
            score: record.score,
            total_points: record.total_points,
            percentage,
            completed_at: record.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(30, 30), 100);
    }
}
