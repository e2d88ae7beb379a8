//! 에러 타입 — 도메인별 에러 정의

/// Cvescope 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum CvescopeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 매칭 엔진 에러
    #[error("match error: {0}")]
    Match(#[from] MatchError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 매칭 엔진 에러
///
/// 매처 크레이트의 도메인 에러(`MatcherError`)가 상위로 전파될 때
/// 이 카테고리로 변환됩니다.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// 입력 문자열 파싱 실패 (버전, CPE 식별자)
    #[error("parse failed: {0}")]
    ParseFailed(String),

    /// 패턴 컴파일 실패
    #[error("pattern error: {0}")]
    Pattern(String),

    /// 질의 구성 실패
    #[error("query error: {0}")]
    Query(String),
}
