//! 설정 관리 — cvescope.toml 파싱 및 런타임 설정
//!
//! [`CvescopeConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`CVESCOPE_MATCHER_THRESHOLD=0.75` 형식)
//! 2. 설정 파일 (`cvescope.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), cvescope_core::error::CvescopeError> {
//! use cvescope_core::config::CvescopeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = CvescopeConfig::load("cvescope.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = CvescopeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, CvescopeError};

/// Cvescope 통합 설정
///
/// `cvescope.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvescopeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 매칭 엔진 설정
    #[serde(default)]
    pub matcher: MatcherSection,
}

impl CvescopeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CvescopeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CvescopeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CvescopeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CvescopeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, CvescopeError> {
        toml::from_str(toml_str).map_err(|e| {
            CvescopeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CVESCOPE_{SECTION}_{FIELD}`
    /// 예: `CVESCOPE_MATCHER_THRESHOLD=0.75`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "CVESCOPE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CVESCOPE_GENERAL_LOG_FORMAT");

        // Matcher
        override_f64(&mut self.matcher.threshold, "CVESCOPE_MATCHER_THRESHOLD");
        override_string(
            &mut self.matcher.min_severity,
            "CVESCOPE_MATCHER_MIN_SEVERITY",
        );
        override_bool(
            &mut self.matcher.normalize_product,
            "CVESCOPE_MATCHER_NORMALIZE_PRODUCT",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), CvescopeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // threshold 검증 — 신뢰도 점수는 [0, 1] 범위
        if !(0.0..=1.0).contains(&self.matcher.threshold) {
            return Err(ConfigError::InvalidValue {
                field: "matcher.threshold".to_owned(),
                reason: "must be within 0.0-1.0".to_owned(),
            }
            .into());
        }

        // min_severity 검증
        let valid_severities = ["info", "low", "medium", "high", "critical"];
        if !valid_severities.contains(&self.matcher.min_severity.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "matcher.min_severity".to_owned(),
                reason: format!("must be one of: {}", valid_severities.join(", ")),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 매칭 엔진 설정 섹션
///
/// 매처 크레이트는 이 섹션을 `MatcherConfig::from_core`로 받아
/// 자체 확장 필드(시그널 가중치 등)와 합칩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherSection {
    /// 정당한 매칭으로 판정할 최소 신뢰도 점수 (0.0-1.0)
    pub threshold: f64,
    /// 결과에 포함할 최소 심각도 (info, low, medium, high, critical)
    pub min_severity: String,
    /// 질의 제품명을 관대한 검색 패턴으로 정규화할지 여부
    pub normalize_product: bool,
}

impl Default for MatcherSection {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            min_severity: "info".to_owned(),
            normalize_product: false,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_f64(target: &mut f64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<f64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse f64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = CvescopeConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert_eq!(config.matcher.threshold, 0.6);
        assert_eq!(config.matcher.min_severity, "info");
        assert!(!config.matcher.normalize_product);
    }

    #[test]
    fn default_config_passes_validation() {
        let config = CvescopeConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = CvescopeConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.matcher.threshold, 0.6);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[matcher]
threshold = 0.75
"#;
        let config = CvescopeConfig::parse(toml).unwrap();
        assert_eq!(config.matcher.threshold, 0.75);
        // 나머지는 기본값 유지
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.matcher.min_severity, "info");
    }

    #[test]
    fn from_str_full_toml() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"

[matcher]
threshold = 0.8
min_severity = "high"
normalize_product = true
"#;
        let config = CvescopeConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.matcher.threshold, 0.8);
        assert_eq!(config.matcher.min_severity, "high");
        assert!(config.matcher.normalize_product);
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let result = CvescopeConfig::parse("invalid = [[[toml");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            CvescopeError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = CvescopeConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut config = CvescopeConfig::default();
        config.matcher.threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("threshold"));

        config.matcher.threshold = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_threshold_boundaries() {
        let mut config = CvescopeConfig::default();
        config.matcher.threshold = 0.0;
        config.validate().unwrap();
        config.matcher.threshold = 1.0;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_invalid_min_severity() {
        let mut config = CvescopeConfig::default();
        config.matcher.min_severity = "severe".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_severity"));
    }

    #[test]
    #[serial]
    fn env_override_threshold() {
        let mut config = CvescopeConfig::default();
        // SAFETY: #[serial] 테스트끼리는 동시에 실행되지 않으므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("CVESCOPE_MATCHER_THRESHOLD", "0.9") };
        config.apply_env_overrides();
        assert_eq!(config.matcher.threshold, 0.9);
        unsafe { std::env::remove_var("CVESCOPE_MATCHER_THRESHOLD") };
    }

    #[test]
    #[serial]
    fn env_override_invalid_f64_keeps_original() {
        let mut config = CvescopeConfig::default();
        // SAFETY: #[serial] 테스트끼리는 동시에 실행되지 않으므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("CVESCOPE_MATCHER_THRESHOLD", "not-a-number") };
        config.apply_env_overrides();
        assert_eq!(config.matcher.threshold, 0.6);
        unsafe { std::env::remove_var("CVESCOPE_MATCHER_THRESHOLD") };
    }

    #[test]
    #[serial]
    fn env_override_missing_var_keeps_original() {
        let mut config = CvescopeConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.matcher.threshold, 0.6);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = CvescopeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = CvescopeConfig::parse(&toml_str).unwrap();
        assert_eq!(config.general.log_level, parsed.general.log_level);
        assert_eq!(config.matcher.threshold, parsed.matcher.threshold);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let result = CvescopeConfig::from_file("/nonexistent/path/cvescope.toml").await;
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            CvescopeError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cvescope.toml");
        std::fs::write(&path, "[matcher]\nthreshold = 0.7\n").unwrap();

        let config = CvescopeConfig::from_file(&path).await.unwrap();
        assert_eq!(config.matcher.threshold, 0.7);
    }

    #[tokio::test]
    async fn from_file_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cvescope.toml");
        std::fs::write(&path, "[matcher]\nthreshold = 2.0\n").unwrap();

        let result = CvescopeConfig::from_file(&path).await;
        assert!(result.is_err());
    }
}
