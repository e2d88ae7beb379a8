//! 매칭 엔진 — 시그널 집계와 후보 스트림 평가
//!
//! [`CveMatcher`]는 질의와 후보 레코드 스트림을 받아 레코드마다
//! [`CveMatch`]를 만들고, 신뢰도 점수가 임계값 이상인 것만 걸러냅니다.
//!
//! # 점수 집계
//!
//! `score = min(1, max(mean(raw), sum(raw)))`
//!
//! `raw`는 시그널별 가중 기여값입니다. 합(sum)은 여러 개의 약한 시그널이
//! 서로 교차 검증할 때 점수를 끌어올리고, 평균(mean)과 1.0 클램프가
//! 결과를 유효한 신뢰도 범위 [0, 1]로 유지합니다.
//!
//! # 스트림 소비
//!
//! 후보 검색은 외부 계층([`CandidateSource`])의 몫입니다. 엔진은 지연
//! 시퀀스를 그대로 소비하므로 호출자는 전체 후보를 메모리에 올리지 않고도
//! 임계값 필터링을 조기 종료할 수 있습니다. 결과 순서는 검색 순서이며,
//! 점수로 재정렬하지 않습니다.

use std::sync::Arc;
use std::sync::OnceLock;

use metrics::counter;
use tracing::{debug, warn};

use cvescope_core::metrics::{
    LABEL_SEVERITY, MATCHER_DEGRADED_RECORDS_TOTAL, MATCHER_LEGITIMATE_MATCHES_TOTAL,
    MATCHER_RECORDS_EVALUATED_TOTAL,
};
use cvescope_core::types::Severity;

use crate::confidence::{
    ConfidenceSignal, product_in_cpe, product_in_summary, vendor_in_cpe, version_in_cpe_range,
};
use crate::config::MatcherConfig;
use crate::error::MatcherError;
use crate::query::CveQuery;
use crate::record::CveRecord;
use crate::summary::SummaryScanner;
use crate::version::Version;

/// 레코드 하나에 대한 평가 결과
///
/// (레코드, 질의) 쌍마다 한 번 생성됩니다. 시그널 판정과 점수는 첫 접근
/// 시 계산되어 단일 할당 셀에 메모이즈되며, 이후 불변입니다.
pub struct CveMatch {
    record: CveRecord,
    query: CveQuery,
    signals: Vec<ConfidenceSignal>,
    raw_values: OnceLock<Vec<f64>>,
    score: OnceLock<f64>,
}

/// 시그널별 점수 내역 한 줄
#[derive(Debug, Clone, PartialEq)]
pub struct SignalScore {
    /// 시그널 이름
    pub name: &'static str,
    /// 시그널 가중치
    pub weight: f64,
    /// 가중 기여값 (하위 시그널 포함)
    pub value: f64,
}

impl CveMatch {
    fn new(record: CveRecord, query: CveQuery, signals: Vec<ConfidenceSignal>) -> Self {
        Self {
            record,
            query,
            signals,
            raw_values: OnceLock::new(),
            score: OnceLock::new(),
        }
    }

    /// 평가 대상 레코드
    pub fn record(&self) -> &CveRecord {
        &self.record
    }

    /// 평가에 사용된 질의
    pub fn query(&self) -> &CveQuery {
        &self.query
    }

    /// 시그널별 가중 기여값을 반환합니다. 첫 호출에서 계산됩니다.
    pub fn raw_values(&self) -> &[f64] {
        self.raw_values.get_or_init(|| {
            self.signals
                .iter()
                .map(|signal| signal.value(&self.record, &self.query))
                .collect()
        })
    }

    /// 신뢰도 점수를 반환합니다 — `min(1, max(mean(raw), sum(raw)))`.
    ///
    /// 첫 호출의 결과가 메모이즈되므로 반복 호출은 시그널을 다시 평가하지
    /// 않습니다.
    pub fn score(&self) -> f64 {
        *self.score.get_or_init(|| {
            let raw = self.raw_values();
            if raw.is_empty() {
                return 0.0;
            }
            let sum: f64 = raw.iter().sum();
            let mean = sum / raw.len() as f64;
            mean.max(sum).min(1.0)
        })
    }

    /// 점수가 임계값 이상이면 정당한 매칭입니다.
    pub fn is_legitimate(&self, threshold: f64) -> bool {
        self.score() >= threshold
    }

    /// 시그널별 점수 내역을 반환합니다.
    pub fn breakdown(&self) -> Vec<SignalScore> {
        self.signals
            .iter()
            .zip(self.raw_values())
            .map(|(signal, value)| SignalScore {
                name: signal.name(),
                weight: signal.weight(),
                value: *value,
            })
            .collect()
    }

    /// 레코드의 CVSS 심각도
    pub fn severity(&self) -> Option<Severity> {
        self.record.severity()
    }
}

impl std::fmt::Debug for CveMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CveMatch")
            .field("cve", &self.record.id())
            .field("query", &self.query.to_string())
            .field("score", &self.score.get())
            .finish_non_exhaustive()
    }
}

/// 외부 후보 검색 계층에 넘길 대략적 필터
///
/// 질의에서 파생된 정규화 제품/벤더 문자열의 단순 전달입니다. 엔진은
/// 필터의 전송 표현(쿼리 언어 등)을 만들지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFilter {
    /// 파생 제품명 (정규화 모드면 패턴 조각)
    pub product: String,
    /// 벤더명 (미지정이면 빈 문자열)
    pub vendor: String,
}

impl CandidateFilter {
    /// 질의에서 필터를 만듭니다.
    pub fn from_query(query: &CveQuery) -> Self {
        Self {
            product: query.product().to_owned(),
            vendor: query.vendor().to_owned(),
        }
    }
}

/// 후보 레코드를 공급하는 외부 검색 계층
///
/// 레코드 저장소 구현체가 이 trait을 구현합니다. 반환 시퀀스는 지연
/// 생성될 수 있고 길이 제한이 없을 수 있습니다.
pub trait CandidateSource {
    /// 대략적 필터에 걸리는 원시 레코드의 지연 시퀀스를 반환합니다.
    fn candidates(&self, filter: &CandidateFilter)
    -> Box<dyn Iterator<Item = CveRecord> + Send + '_>;
}

/// CVE 매칭 엔진
pub struct CveMatcher {
    config: MatcherConfig,
    scanner: Arc<SummaryScanner>,
}

impl CveMatcher {
    /// 설정을 검증하고 엔진을 생성합니다.
    ///
    /// 잘못된 임계값/가중치와 규칙 패턴 컴파일 실패는 여기서 즉시
    /// 반환됩니다 — 평가 도중에는 어떤 에러도 발생하지 않습니다.
    pub fn new(config: MatcherConfig) -> Result<Self, MatcherError> {
        config.validate()?;
        let scanner = Arc::new(SummaryScanner::new()?);
        Ok(Self { config, scanner })
    }

    /// 기본 설정으로 엔진을 생성합니다.
    pub fn with_default_config() -> Result<Self, MatcherError> {
        Self::new(MatcherConfig::default())
    }

    /// 현재 설정
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// 엔진 설정에 따라 질의를 만듭니다.
    ///
    /// 버전 문자열을 파싱하고 `normalize_product` 설정을 적용하는 편의
    /// 생성자입니다.
    pub fn query(
        &self,
        vendor: impl Into<String>,
        product: impl Into<String>,
        version: &str,
    ) -> Result<CveQuery, MatcherError> {
        let version = Version::parse(version)?;
        CveQuery::new(vendor, product, version, self.config.normalize_product)
    }

    /// 레코드 하나를 질의에 대해 평가합니다.
    ///
    /// 시그널은 아직 계산되지 않은 상태로 반환되며, `score()` 첫 호출에서
    /// 평가됩니다. 레코드가 손상되어도 실패하지 않습니다 — 손상된 필드는
    /// 해당 시그널의 false 판정으로 강등됩니다.
    pub fn evaluate(&self, record: CveRecord, query: &CveQuery) -> CveMatch {
        counter!(MATCHER_RECORDS_EVALUATED_TOTAL).increment(1);
        if record.summary().is_none() && record.cpe_entries().next().is_none() {
            counter!(MATCHER_DEGRADED_RECORDS_TOTAL).increment(1);
            debug!(cve = record.id(), "record has no summary and no cpe entries");
        }

        let signals = self.build_signals();
        CveMatch::new(record, query.clone(), signals)
    }

    /// 후보 스트림을 지연 평가하여 정당한 매칭만 내보냅니다.
    ///
    /// 결과는 검색 순서를 유지합니다. 임계값 미달이거나 심각도가
    /// `min_severity` 미만인 레코드는 걸러집니다 (심각도를 알 수 없는
    /// 레코드는 통과).
    pub fn search<'a, I>(
        &'a self,
        candidates: I,
        query: &'a CveQuery,
    ) -> impl Iterator<Item = CveMatch> + 'a
    where
        I: IntoIterator<Item = CveRecord> + 'a,
    {
        let threshold = self.config.threshold;
        let min_severity = self.config.min_severity;

        candidates
            .into_iter()
            .map(move |record| self.evaluate(record, query))
            .filter(move |candidate| {
                let score = candidate.score();
                debug!(
                    cve = candidate.record().id(),
                    score,
                    raw = ?candidate.raw_values(),
                    "candidate scored"
                );
                if !candidate.is_legitimate(threshold) {
                    return false;
                }
                if !candidate
                    .severity()
                    .is_none_or(|severity| severity >= min_severity)
                {
                    return false;
                }
                let severity_label = candidate
                    .severity()
                    .map(|severity| severity.to_string().to_lowercase())
                    .unwrap_or_else(|| "unknown".to_owned());
                counter!(MATCHER_LEGITIMATE_MATCHES_TOTAL, LABEL_SEVERITY => severity_label)
                    .increment(1);
                true
            })
    }

    /// 외부 후보 소스에 질의 기반 필터를 넘겨 검색하고 평가합니다.
    pub fn search_source<'a>(
        &'a self,
        source: &'a dyn CandidateSource,
        query: &'a CveQuery,
    ) -> impl Iterator<Item = CveMatch> + 'a {
        let filter = CandidateFilter::from_query(query);
        debug!(product = %filter.product, vendor = %filter.vendor, "querying candidate source");
        self.search(source.candidates(&filter), query)
    }

    /// 후보 레코드 배치를 블로킹 워커 풀에서 병렬 평가합니다.
    ///
    /// 매칭 생성은 호출 스레드에서 하고(저렴함), 시그널 평가와 점수 계산은
    /// 워커에서 끝냅니다. 결과는 입력 순서대로 반환됩니다. 임계값 필터링은
    /// 하지 않으므로 호출자가 [`CveMatch::is_legitimate`]로 거릅니다.
    /// 실패한 워커 태스크는 경고 로그 후 건너뜁니다 — 배치 전체를
    /// 실패시키지 않습니다.
    pub async fn evaluate_batch(
        &self,
        records: Vec<CveRecord>,
        query: &CveQuery,
    ) -> Vec<CveMatch> {
        let mut tasks = tokio::task::JoinSet::new();
        for (index, record) in records.into_iter().enumerate() {
            let candidate = self.evaluate(record, query);
            tasks.spawn_blocking(move || {
                candidate.score();
                (index, candidate)
            });
        }

        let mut scored = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(pair) => scored.push(pair),
                Err(e) => warn!(error = %e, "batch evaluation task failed"),
            }
        }
        scored.sort_by_key(|(index, _)| *index);
        scored.into_iter().map(|(_, candidate)| candidate).collect()
    }

    /// 내장 시그널 세트를 만듭니다.
    ///
    /// 버전-CPE-범위 시그널은 제품-CPE 시그널의 하위로, 부모가 성립할
    /// 때만 평가됩니다.
    fn build_signals(&self) -> Vec<ConfidenceSignal> {
        let weights = &self.config.weights;
        let scanner = Arc::clone(&self.scanner);

        vec![
            ConfidenceSignal::new(
                "product name in summary",
                weights.product_in_summary,
                Box::new(product_in_summary),
            ),
            ConfidenceSignal::new(
                "product name in cpe",
                weights.product_in_cpe,
                Box::new(product_in_cpe),
            )
            .with_child(ConfidenceSignal::new(
                "version in cpe range",
                weights.version_in_cpe_range,
                Box::new(version_in_cpe_range),
            )),
            ConfidenceSignal::new(
                "vendor name in cpe",
                weights.vendor_in_cpe,
                Box::new(vendor_in_cpe),
            ),
            ConfidenceSignal::new(
                "version in summary",
                weights.version_in_summary,
                Box::new(move |record: &CveRecord, query: &CveQuery| {
                    record
                        .summary()
                        .and_then(|summary| scanner.scan(summary, query.version()))
                        .is_some()
                }),
            ),
        ]
    }
}
