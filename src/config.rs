//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로 (퀴즈 카탈로그 + 게임 기록)
//! - `JWT_SECRET`: JWT 토큰 검증에 사용할 비밀키
//! - `HOST`: 서버 바인딩 주소
//! - `PORT`: 서버 포트 번호
//! - `SESSION_TTL_SECS`: 활동 없는 라이브 세션을 보관하는 시간
//! - `SWEEP_INTERVAL_SECS`: 만료 세션 정리 주기
//! - `MAX_PLAYERS`: 세션 생성 시 기본 참가 인원 상한

use std::env;
use std::str::FromStr;

use crate::services::game::GameSettings;

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 URL (예: "sqlite:data/quizrush.db?mode=rwc")
    pub database_url: String,
    /// JWT 토큰 검증에 사용하는 비밀키
    pub jwt_secret: String,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3000)
    pub port: u16,
    /// 마지막 활동 후 이 시간(초)이 지나면 세션을 정리합니다 (기본값: 24시간)
    pub session_ttl_secs: u64,
    /// 정리 작업 실행 주기(초) (기본값: 60)
    pub sweep_interval_secs: u64,
    /// 기본 참가 인원 상한 (기본값: 50)
    pub max_players: usize,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`은 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 기본값이 있어 환경변수가 없어도 동작합니다.
    /// 숫자 설정값을 파싱할 수 없으면 기본값을 사용합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?, // 필수: 없으면 에러
            jwt_secret: env::var("JWT_SECRET")?,     // 필수: 없으면 에러
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3000),
            session_ttl_secs: parse_or("SESSION_TTL_SECS", 86_400),
            sweep_interval_secs: parse_or("SWEEP_INTERVAL_SECS", 60).max(1),
            max_players: parse_or("MAX_PLAYERS", 50).max(1),
        })
    }

    /// 게임 엔진에 넘길 설정
    pub fn game_settings(&self) -> GameSettings {
        GameSettings {
            default_max_players: self.max_players,
            // u64 → i64 변환이 항상 성공하도록 상한을 둡니다.
            session_ttl: chrono::Duration::seconds(
                self.session_ttl_secs.min(MAX_SESSION_TTL_SECS) as i64,
            ),
        }
    }
}

/// 세션 보관 시간 상한 (10년)
const MAX_SESSION_TTL_SECS: u64 = 10 * 365 * 86_400;

/// 환경변수를 숫자로 읽습니다. 없거나 잘못된 값이면 기본값
fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_settings_follow_config() {
        let config = Config {
            database_url: "sqlite::memory:".into(),
            jwt_secret: "secret".into(),
            host: "127.0.0.1".into(),
            port: 3000,
            session_ttl_secs: 600,
            sweep_interval_secs: 60,
            max_players: 8,
        };

        let settings = config.game_settings();
        assert_eq!(settings.default_max_players, 8);
        assert_eq!(settings.session_ttl, chrono::Duration::minutes(10));
    }
}
