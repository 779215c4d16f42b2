//! # 답안 값(Answer Value) 모델
//!
//! 문제의 정답과 플레이어가 제출한 답안은 형태가 여러 가지입니다:
//! 보기 인덱스(숫자), 보기 텍스트(문자열), 참/거짓(불리언), 여러 개 선택(배열).
//!
//! 동적 타입 대신 **태그된 유니온(enum)** 으로 모델링하여
//! 평가기(evaluator)가 모든 경우를 빠짐없이(exhaustive) 처리하도록 합니다.
//!
//! ```text
//! AnswerValue
//! ├── Scalar(Scalar)      예: 1, "Paris", true
//! └── List(Vec<Scalar>)   예: [0, 2], ["X", "Z"]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// 단일 값 — JSON의 불리언/숫자/문자열 중 하나
///
/// `#[serde(untagged)]`: JSON에 타입 태그 없이 값의 모양만 보고 variant를 결정합니다.
/// `true` → `Bool`, `1` → `Number`, `"B"` → `Text`, 배열 안의 `null` → `Null`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// 배열 원소로 온 `null`. 비교할 때는 빈 문자열과 같습니다.
    Null,
    Bool(bool),
    /// serde_json::Number는 정수/실수를 구분해 보존합니다.
    /// 보기 인덱스로 쓰일 때는 `as_u64()`로 정수인지 확인합니다.
    Number(Number),
    Text(String),
}

impl Scalar {
    /// 비교용 정규화: 앞뒤 공백 제거 + 소문자화.
    /// 숫자와 불리언은 문자열로 바꾼 뒤 같은 규칙을 적용합니다.
    pub fn normalized(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => n.to_string().trim().to_lowercase(),
            Scalar::Text(s) => s.trim().to_lowercase(),
        }
    }

    /// 보기 인덱스로 해석 가능한 음이 아닌 정수이면 `Some(index)`
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Scalar::Number(n) => n.as_u64().and_then(|v| usize::try_from(v).ok()),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Scalar::Number(_))
    }

    /// 기록(history) 표시용 원문 문자열
    pub fn display(&self) -> String {
        match self {
            Scalar::Null => String::new(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::Number(Number::from(value))
    }
}

/// 정답 또는 제출된 답안
///
/// 값이 "없음"(null/필드 누락)은 `Option<AnswerValue>`의 `None`으로 표현합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl AnswerValue {
    pub fn text(value: &str) -> Self {
        AnswerValue::Scalar(Scalar::from(value))
    }

    pub fn list<T: Into<Scalar>>(items: impl IntoIterator<Item = T>) -> Self {
        AnswerValue::List(items.into_iter().map(Into::into).collect())
    }

    /// 빈 배열, 공백뿐인 문자열은 "빈 답안"입니다. 빈 답안은 항상 오답 처리됩니다.
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Scalar(Scalar::Text(s)) => s.trim().is_empty(),
            AnswerValue::Scalar(Scalar::Null) => true,
            AnswerValue::Scalar(_) => false,
            AnswerValue::List(items) => items.is_empty(),
        }
    }
}

impl From<Scalar> for AnswerValue {
    fn from(value: Scalar) -> Self {
        AnswerValue::Scalar(value)
    }
}

/// `None`(null)도 빈 답안으로 취급하는 헬퍼
pub fn is_blank_answer(value: Option<&AnswerValue>) -> bool {
    value.map_or(true, AnswerValue::is_blank)
}
