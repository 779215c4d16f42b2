//! 요청 추출기(extractor) 모음: JWT 인증과 JSON 본문

pub mod auth;
pub mod json;
