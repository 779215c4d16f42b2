//! # 퀴즈/문제 모델
//!
//! 퀴즈 카탈로그(외부 작성 도구가 관리)에서 읽어오는 퀴즈와 문제 정의입니다.
//! 라이브 세션은 생성 시점의 퀴즈를 **스냅샷**으로 복사해 보관하므로,
//! 게임 도중 원본 퀴즈가 수정되어도 채점 결과가 바뀌지 않습니다.

use serde::{Deserialize, Serialize};

use super::answer::AnswerValue;

/// 문제 유형
///
/// 저장된 데이터에는 과거 이름(인도네시아어 라벨 등)이 섞여 있으므로
/// `#[serde(alias = ...)]`로 모두 받아들이고, 직렬화는 표준 이름으로 합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    /// 보기 중 하나 선택
    #[serde(alias = "Pilihan Ganda")]
    SingleChoice,
    /// 보기 여러 개 선택
    #[serde(alias = "multiple-answer")]
    MultipleChoice,
    /// 참/거짓
    #[serde(alias = "Benar Salah")]
    TrueFalse,
    /// 주관식 단답
    #[serde(alias = "Isian")]
    ShortAnswer,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single-choice",
            QuestionType::MultipleChoice => "multiple-choice",
            QuestionType::TrueFalse => "true-false",
            QuestionType::ShortAnswer => "short-answer",
        }
    }

    /// DB의 `question_type` 컬럼 값을 파싱합니다. 별칭도 허용합니다.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "single-choice" | "Pilihan Ganda" => Some(QuestionType::SingleChoice),
            "multiple-choice" | "multiple-answer" => Some(QuestionType::MultipleChoice),
            "true-false" | "Benar Salah" => Some(QuestionType::TrueFalse),
            "short-answer" | "Isian" => Some(QuestionType::ShortAnswer),
            _ => None,
        }
    }
}

fn default_points() -> u32 {
    1
}

fn default_time_limit() -> u32 {
    30
}

/// 문제 하나
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    /// 문제 본문
    pub question: String,
    pub question_type: QuestionType,
    /// 보기 텍스트 목록 (선택형 문제만 사용)
    #[serde(default)]
    pub options: Vec<String>,
    /// 정답 — 보기 인덱스, 인덱스 배열, 불리언, 텍스트 중 하나
    #[serde(default)]
    pub correct_answer: Option<AnswerValue>,
    /// 주관식에서 함께 인정하는 답 (대소문자 무시)
    #[serde(default)]
    pub accepted_answers: Vec<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    /// 정답 시 획득 점수 (기본 1)
    #[serde(default = "default_points")]
    pub points: u32,
    /// 제한 시간(초, 기본 30)
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
}

/// 퀴즈 — 순서가 있는 문제 목록
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// 퀴즈 소유자(작성자) 사용자 ID — 세션을 열 수 있는 유일한 호스트
    pub created_by: String,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    /// 모든 문제를 맞혔을 때의 최대 점수
    pub fn total_points(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }
}

/// `questions` 테이블 한 행 — JSON 컬럼은 문자열로 읽은 뒤 변환합니다.
#[derive(Debug, sqlx::FromRow)]
pub struct QuestionRow {
    pub id: String,
    pub question: String,
    pub question_type: String,
    pub options: String,
    pub correct_answer: Option<String>,
    pub accepted_answers: String,
    pub explanation: Option<String>,
    pub points: i64,
    pub time_limit: i64,
}

/// `quizzes` 테이블 한 행
#[derive(Debug, sqlx::FromRow)]
pub struct QuizRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub created_by: String,
}
