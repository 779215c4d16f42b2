//! # 답안 평가기(Answer Evaluator)
//!
//! 제출된 답안이 문제의 정답과 일치하는지 판정하는 **순수 함수** 모음입니다.
//! 게임 상태에 의존하지 않고 부작용도 없으므로, 라이브 세션뿐 아니라
//! 어디서든 같은 결과를 얻습니다. 점수 누적은 세션 쪽 책임입니다.
//!
//! ## 판정 순서
//! 1. 빈 답안(null, 빈 문자열, 빈 배열)은 무조건 오답
//! 2. 참/거짓 문제는 정규화된 참/거짓 값끼리 비교 ("benar"/"salah" 포함)
//! 3. 정답이 배열이면 집합 비교 (숫자 배열은 보기 텍스트로 변환)
//! 4. 정답이 보기 인덱스이면 그 보기 텍스트와 비교
//! 5. 그 외에는 정규화된 값끼리 비교
//! 6. 여전히 오답이면 `accepted_answers` 중 하나와 일치하는지 확인
//!
//! 정규화 규칙: 앞뒤 공백 제거 + 소문자화, 숫자/불리언은 문자열로 변환.

use crate::models::{is_blank_answer, AnswerValue, Question, QuestionType, Scalar};

/// 답안이 맞았는지 판정합니다.
pub fn evaluate(question: &Question, submitted: Option<&AnswerValue>) -> bool {
    let Some(submitted) = submitted else {
        return false;
    };
    if is_blank_answer(Some(submitted)) {
        return false;
    }

    let correct_set = correct_answer_set(question);

    let is_correct = match (question.question_type, question.correct_answer.as_ref()) {
        (QuestionType::TrueFalse, Some(correct)) => matches_boolean(question, correct, submitted),
        (_, Some(AnswerValue::List(_))) => {
            // correct_set은 정답이 배열일 때 항상 Some
            correct_set
                .as_deref()
                .is_some_and(|set| matches_set(set, submitted))
        }
        (_, Some(AnswerValue::Scalar(correct))) => {
            matches_scalar(&scalar_text(question, correct), submitted)
        }
        (_, None) => false,
    };

    is_correct || matches_accepted(question, correct_set.as_deref(), submitted)
}

/// 점수 계산: 정답이면 문제 배점, 오답이면 0
pub fn points_for(question: &Question, is_correct: bool) -> u32 {
    if is_correct {
        question.points
    } else {
        0
    }
}

/// 보기 인덱스이면 해당 보기 텍스트로, 아니면 값 그대로 정규화합니다.
fn scalar_text(question: &Question, value: &Scalar) -> String {
    match value.as_index().and_then(|idx| question.options.get(idx)) {
        Some(option) => normalize(option),
        None => value.normalized(),
    }
}

/// 정답 배열을 정규화 + 정렬합니다.
/// 전부 숫자이고 보기가 있으면 인덱스로 보고 보기 텍스트로 바꿉니다.
/// 범위를 벗어난 인덱스는 버립니다.
fn correct_answer_set(question: &Question) -> Option<Vec<String>> {
    let AnswerValue::List(items) = question.correct_answer.as_ref()? else {
        return None;
    };

    let all_indices = !question.options.is_empty() && items.iter().all(Scalar::is_number);
    let mut set: Vec<String> = if all_indices {
        items
            .iter()
            .filter_map(|item| item.as_index().and_then(|idx| question.options.get(idx)))
            .map(|option| normalize(option))
            .collect()
    } else {
        items.iter().map(Scalar::normalized).collect()
    };
    set.sort();
    Some(set)
}

fn normalized_sorted(items: &[Scalar]) -> Vec<String> {
    let mut values: Vec<String> = items.iter().map(Scalar::normalized).collect();
    values.sort();
    values
}

/// 복수 정답: 제출 배열이 길이까지 같은 집합이어야 정답.
/// 단일 값 제출은 정답 집합의 원소인지만 봅니다.
fn matches_set(correct: &[String], submitted: &AnswerValue) -> bool {
    match submitted {
        AnswerValue::List(items) => normalized_sorted(items) == correct,
        AnswerValue::Scalar(value) => correct.contains(&value.normalized()),
    }
}

/// 단일 정답: 배열 제출은 오답
fn matches_scalar(correct: &str, submitted: &AnswerValue) -> bool {
    match submitted {
        AnswerValue::Scalar(value) => value.normalized() == correct,
        AnswerValue::List(_) => false,
    }
}

/// 참/거짓 정규화: 불리언, "true"/"false", "benar"/"salah"
fn canonical_bool(normalized: &str) -> Option<bool> {
    match normalized {
        "true" | "benar" => Some(true),
        "false" | "salah" => Some(false),
        _ => None,
    }
}

fn matches_boolean(question: &Question, correct: &AnswerValue, submitted: &AnswerValue) -> bool {
    let (AnswerValue::Scalar(correct), AnswerValue::Scalar(submitted)) = (correct, submitted) else {
        return false;
    };

    // 정답이 ["Benar", "Salah"] 보기의 인덱스로 저장된 경우도 있습니다.
    let correct_text = scalar_text(question, correct);
    let submitted_text = submitted.normalized();

    match (canonical_bool(&correct_text), canonical_bool(&submitted_text)) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => correct_text == submitted_text,
    }
}

/// `accepted_answers` 대조. 배열 제출은 모든 원소가 허용 목록에 있어야 하고,
/// 정답이 배열이면 길이도 같아야 합니다.
fn matches_accepted(
    question: &Question,
    correct_set: Option<&[String]>,
    submitted: &AnswerValue,
) -> bool {
    if question.accepted_answers.is_empty() {
        return false;
    }
    let accepted: Vec<String> = question.accepted_answers.iter().map(|a| normalize(a)).collect();

    match submitted {
        AnswerValue::Scalar(value) => accepted.contains(&value.normalized()),
        AnswerValue::List(items) => {
            let values = normalized_sorted(items);
            values.iter().all(|v| accepted.contains(v))
                && correct_set.map_or(true, |set| set.len() == values.len())
        }
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(question_type: QuestionType, options: &[&str], correct: serde_json::Value) -> Question {
        Question {
            id: "q1".to_string(),
            question: "?".to_string(),
            question_type,
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: serde_json::from_value(correct).unwrap(),
            accepted_answers: Vec::new(),
            explanation: None,
            points: 1,
            time_limit: 30,
        }
    }

    fn answer(value: serde_json::Value) -> Option<AnswerValue> {
        serde_json::from_value(value).unwrap()
    }

    fn check(q: &Question, value: serde_json::Value) -> bool {
        evaluate(q, answer(value).as_ref())
    }

    #[test]
    fn single_choice_index_maps_to_option_text() {
        let q = question(QuestionType::SingleChoice, &["A", "B", "C"], json!(1));
        assert!(check(&q, json!("B")));
        assert!(check(&q, json!("b")));
        assert!(check(&q, json!("  B ")));
        assert!(!check(&q, json!("A")));
        assert!(!check(&q, json!("")));
        assert!(!check(&q, json!(null)));
    }

    #[test]
    fn single_choice_text_answer() {
        let q = question(QuestionType::SingleChoice, &["Red", "Blue"], json!("Blue"));
        assert!(check(&q, json!("BLUE")));
        assert!(!check(&q, json!(["Blue"])));
    }

    #[test]
    fn out_of_range_index_compares_as_number() {
        let q = question(QuestionType::SingleChoice, &["A"], json!(5));
        assert!(check(&q, json!(5)));
        assert!(check(&q, json!("5")));
        assert!(!check(&q, json!("A")));
    }

    #[test]
    fn multiple_choice_requires_set_equality() {
        let q = question(QuestionType::MultipleChoice, &["X", "Y", "Z"], json!([0, 2]));
        assert!(check(&q, json!(["Z", "X"])));
        assert!(check(&q, json!(["x", " z "])));
        assert!(!check(&q, json!(["X"])));
        assert!(!check(&q, json!(["X", "Y", "Z"])));
        assert!(!check(&q, json!(["X", "Y"])));
        assert!(!check(&q, json!([])));
    }

    #[test]
    fn null_elements_compare_as_empty_text() {
        let q = question(QuestionType::MultipleChoice, &["X", "Y", "Z"], json!([0, 2]));
        assert!(!check(&q, json!(["Z", null])));
        assert!(!check(&q, json!(["X", null, "Z"])));
        assert!(!check(&q, json!([null])));

        let q = question(QuestionType::ShortAnswer, &[], json!("Paris"));
        assert!(!check(&q, json!(["Paris", null])));
    }

    #[test]
    fn multiple_choice_scalar_is_membership() {
        let q = question(QuestionType::MultipleChoice, &["X", "Y", "Z"], json!([0, 2]));
        assert!(check(&q, json!("Z")));
        assert!(!check(&q, json!("Y")));
    }

    #[test]
    fn multiple_choice_with_text_correct_answers() {
        let q = question(QuestionType::MultipleChoice, &[], json!(["Rust", "Go"]));
        assert!(check(&q, json!(["go", "rust"])));
        assert!(!check(&q, json!(["go"])));
    }

    #[test]
    fn boolean_normalization() {
        let q = question(QuestionType::TrueFalse, &[], json!(true));
        assert!(check(&q, json!("True")));
        assert!(check(&q, json!("benar")));
        assert!(check(&q, json!(true)));
        assert!(check(&q, json!(" BENAR ")));
        assert!(!check(&q, json!("salah")));
        assert!(!check(&q, json!(false)));
        assert!(!check(&q, json!("")));
    }

    #[test]
    fn boolean_stored_as_localized_string() {
        let q = question(QuestionType::TrueFalse, &[], json!("Salah"));
        assert!(check(&q, json!(false)));
        assert!(check(&q, json!("false")));
        assert!(!check(&q, json!("benar")));
    }

    #[test]
    fn boolean_stored_as_option_index() {
        let q = question(QuestionType::TrueFalse, &["Benar", "Salah"], json!(0));
        assert!(check(&q, json!(true)));
        assert!(!check(&q, json!("salah")));
    }

    #[test]
    fn short_answer_falls_back_to_accepted_answers() {
        let mut q = question(QuestionType::ShortAnswer, &[], json!("Paris"));
        q.accepted_answers = vec!["paris".to_string(), "Paris ".to_string()];
        assert!(check(&q, json!(" PARIS")));
        assert!(!check(&q, json!("")));
        assert!(!check(&q, json!("London")));

        q.correct_answer = None;
        assert!(check(&q, json!("paris")));
    }

    #[test]
    fn short_answer_without_accepted_answers() {
        let q = question(QuestionType::ShortAnswer, &[], json!("Jakarta"));
        assert!(check(&q, json!("jakarta")));
        assert!(!check(&q, json!("bandung")));
    }

    #[test]
    fn accepted_answers_for_array_submission_respect_length() {
        let mut q = question(QuestionType::MultipleChoice, &[], json!(["a", "b"]));
        q.accepted_answers = vec!["A".into(), "B".into(), "C".into()];
        assert!(check(&q, json!(["c", "a"])));
        assert!(!check(&q, json!(["c"])));
    }

    #[test]
    fn points_only_for_correct_answers() {
        let mut q = question(QuestionType::SingleChoice, &["A"], json!(0));
        q.points = 20;
        assert_eq!(points_for(&q, true), 20);
        assert_eq!(points_for(&q, false), 0);
    }
}
