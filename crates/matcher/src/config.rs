//! 매칭 엔진 설정
//!
//! [`MatcherConfig`]는 core의 [`MatcherSection`](cvescope_core::config::MatcherSection)을
//! 확장하여 엔진 고유 설정(시그널 가중치)을 추가합니다.
//!
//! # 사용 예시
//!
//! ```
//! use cvescope_matcher::MatcherConfig;
//!
//! // 기본값으로 생성
//! let config = MatcherConfig::default();
//! config.validate().unwrap();
//!
//! // 빌더로 생성
//! use cvescope_matcher::MatcherConfigBuilder;
//!
//! let config = MatcherConfigBuilder::new()
//!     .threshold(0.75)
//!     .normalize_product(true)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};

use cvescope_core::types::Severity;

use crate::error::MatcherError;

/// 매칭 엔진 설정
///
/// core의 `MatcherSection`에서 파생되며, 모듈 고유 확장 필드를 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// 정당한 매칭으로 판정할 최소 신뢰도 점수 (0.0-1.0)
    pub threshold: f64,
    /// 결과에 포함할 최소 심각도
    pub min_severity: Severity,
    /// 질의 제품명을 관대한 검색 패턴으로 정규화할지 여부
    pub normalize_product: bool,

    // --- 모듈 고유 확장 ---
    /// 시그널 가중치
    pub weights: SignalWeights,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            min_severity: Severity::Info,
            normalize_product: false,
            weights: SignalWeights::default(),
        }
    }
}

impl MatcherConfig {
    /// core의 `MatcherSection`에서 엔진 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값을 사용합니다.
    pub fn from_core(core: &cvescope_core::config::MatcherSection) -> Self {
        let min_severity =
            Severity::from_str_loose(&core.min_severity).unwrap_or(Severity::Info);

        Self {
            threshold: core.threshold,
            min_severity,
            normalize_product: core.normalize_product,
            ..Self::default()
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `threshold`: 0.0-1.0
    /// - 모든 시그널 가중치: 0 이상의 유한한 값
    pub fn validate(&self) -> Result<(), MatcherError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(MatcherError::Config {
                field: "threshold".to_owned(),
                reason: "must be within 0.0-1.0".to_owned(),
            });
        }

        for (name, weight) in [
            ("weights.product_in_summary", self.weights.product_in_summary),
            ("weights.product_in_cpe", self.weights.product_in_cpe),
            ("weights.vendor_in_cpe", self.weights.vendor_in_cpe),
            (
                "weights.version_in_cpe_range",
                self.weights.version_in_cpe_range,
            ),
            (
                "weights.version_in_summary",
                self.weights.version_in_summary,
            ),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(MatcherError::Config {
                    field: name.to_owned(),
                    reason: "must be a finite value >= 0".to_owned(),
                });
            }
        }

        Ok(())
    }
}

/// 시그널 가중치
///
/// `version_in_cpe_range`는 `product_in_cpe`의 하위 시그널 가중치로,
/// 부모 가중치에 곱해져 기여합니다 (0.35 × 0.40 = 0.14).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    /// 제품명이 설명 텍스트에 존재
    pub product_in_summary: f64,
    /// 제품명이 CPE에 존재
    pub product_in_cpe: f64,
    /// 벤더명이 CPE에 존재
    pub vendor_in_cpe: f64,
    /// 버전이 CPE 취약 구간에 포함 (product_in_cpe의 하위)
    pub version_in_cpe_range: f64,
    /// 버전이 설명 텍스트에 언급된 범위에 포함
    pub version_in_summary: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            product_in_summary: 0.25,
            product_in_cpe: 0.35,
            vendor_in_cpe: 0.20,
            version_in_cpe_range: 0.40,
            version_in_summary: 0.30,
        }
    }
}

/// [`MatcherConfig`] 빌더
#[derive(Default)]
pub struct MatcherConfigBuilder {
    config: MatcherConfig,
}

impl MatcherConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 신뢰도 임계값을 설정합니다.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// 최소 심각도를 설정합니다.
    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.config.min_severity = severity;
        self
    }

    /// 제품명 정규화 여부를 설정합니다.
    pub fn normalize_product(mut self, normalize: bool) -> Self {
        self.config.normalize_product = normalize;
        self
    }

    /// 시그널 가중치를 설정합니다.
    pub fn weights(mut self, weights: SignalWeights) -> Self {
        self.config.weights = weights;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `MatcherError::Config` 반환
    pub fn build(self) -> Result<MatcherConfig, MatcherError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
