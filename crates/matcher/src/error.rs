//! 매칭 엔진 에러 타입
//!
//! [`MatcherError`]는 매칭 엔진 내에서 발생할 수 있는 모든 에러를 나타냅니다.
//! `From<MatcherError> for CvescopeError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.
//!
//! 후보 레코드 내부의 손상된 필드(버전 문자열, CPE 식별자)는 여기로
//! 전파되지 않습니다. 시그널 평가는 그런 입력을 false로 강등시키며,
//! 이 에러들은 호출자가 직접 넘긴 입력(질의, 설정)에만 발생합니다.

use cvescope_core::error::{ConfigError, CvescopeError, MatchError};

/// 매칭 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    /// 버전 문자열 파싱 실패
    #[error("version parse error: '{version}': {reason}")]
    VersionParse {
        /// 파싱 대상 버전 문자열
        version: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// CPE 식별자 파싱 실패
    #[error("cpe parse error: '{uri}': {reason}")]
    CpeParse {
        /// 파싱 대상 CPE 식별자
        uri: String,
        /// 파싱 실패 사유
        reason: String,
    },

    /// 정규식 패턴 컴파일 실패
    #[error("pattern error: {0}")]
    Pattern(String),

    /// 질의 구성 실패
    #[error("query error: {field}: {reason}")]
    Query {
        /// 문제가 된 질의 필드명
        field: String,
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<MatcherError> for CvescopeError {
    fn from(err: MatcherError) -> Self {
        match err {
            MatcherError::VersionParse { version, reason } => CvescopeError::Match(
                MatchError::ParseFailed(format!("version '{version}': {reason}")),
            ),
            MatcherError::CpeParse { uri, reason } => {
                CvescopeError::Match(MatchError::ParseFailed(format!("cpe '{uri}': {reason}")))
            }
            MatcherError::Pattern(msg) => CvescopeError::Match(MatchError::Pattern(msg)),
            MatcherError::Query { field, reason } => {
                CvescopeError::Match(MatchError::Query(format!("{field}: {reason}")))
            }
            MatcherError::Config { field, reason } => {
                CvescopeError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parse_error_display() {
        let err = MatcherError::VersionParse {
            version: "not-a-version".to_owned(),
            reason: "no leading digit".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("not-a-version"));
        assert!(msg.contains("no leading digit"));
    }

    #[test]
    fn converts_to_core_match_error() {
        let err = MatcherError::CpeParse {
            uri: "cpe:/bad".to_owned(),
            reason: "unsupported prefix".to_owned(),
        };
        let core: CvescopeError = err.into();
        assert!(matches!(core, CvescopeError::Match(_)));
        assert!(core.to_string().contains("cpe:/bad"));
    }

    #[test]
    fn config_variant_converts_to_core_config_error() {
        let err = MatcherError::Config {
            field: "threshold".to_owned(),
            reason: "must be within 0.0-1.0".to_owned(),
        };
        let core: CvescopeError = err.into();
        assert!(matches!(core, CvescopeError::Config(_)));
    }
}
