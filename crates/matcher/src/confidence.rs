//! 신뢰도 시그널 — 독립적인 가중치 검사와 게이트된 하위 시그널
//!
//! [`ConfidenceSignal`]은 `(레코드, 질의) → bool` 계약의 순수 검사 하나를
//! 이름/가중치와 함께 묶습니다. 판정은 단일 할당 셀(`OnceLock`)에
//! 메모이즈되어 매칭당 최대 한 번만 평가됩니다. 시그널은 부수효과가
//! 없으므로 병렬 평가에도 안전합니다.
//!
//! 하위 시그널은 명시적 트리로 표현합니다. 부모가 성립할 때만 평가되며,
//! `부모 가중치 × 하위 기여`만큼 점수에 더해집니다.

use std::sync::OnceLock;

use tracing::debug;

use crate::query::CveQuery;
use crate::record::CveRecord;

/// 시그널 검사 함수 계약: `(레코드, 질의) → bool`
pub type SignalCheck = Box<dyn Fn(&CveRecord, &CveQuery) -> bool + Send + Sync>;

/// 이름/가중치가 붙은 신뢰도 시그널 하나
pub struct ConfidenceSignal {
    name: &'static str,
    weight: f64,
    check: SignalCheck,
    children: Vec<ConfidenceSignal>,
    verdict: OnceLock<bool>,
}

impl ConfidenceSignal {
    /// 새 시그널을 생성합니다. 가중치는 0 이상이어야 합니다.
    pub fn new(name: &'static str, weight: f64, check: SignalCheck) -> Self {
        Self {
            name,
            weight,
            check,
            children: Vec::new(),
            verdict: OnceLock::new(),
        }
    }

    /// 이 시그널이 성립할 때만 평가되는 하위 시그널을 붙입니다.
    pub fn with_child(mut self, child: ConfidenceSignal) -> Self {
        self.children.push(child);
        self
    }

    /// 시그널 이름
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 시그널 가중치
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// 하위 시그널 목록
    pub fn children(&self) -> &[ConfidenceSignal] {
        &self.children
    }

    /// 시그널을 평가합니다. 첫 호출의 판정이 메모이즈됩니다.
    pub fn is_confident(&self, record: &CveRecord, query: &CveQuery) -> bool {
        *self.verdict.get_or_init(|| {
            debug!(signal = self.name, cve = record.id(), "evaluating confidence signal");
            (self.check)(record, query)
        })
    }

    /// 이 시그널(하위 포함)의 가중 기여값을 계산합니다.
    ///
    /// 성립하지 않으면 0, 성립하면 자기 가중치에 성립한 하위 시그널들의
    /// 기여(부모 가중치로 스케일)를 더한 값입니다.
    pub fn value(&self, record: &CveRecord, query: &CveQuery) -> f64 {
        if !self.is_confident(record, query) {
            return 0.0;
        }
        let mut value = self.weight;
        for child in &self.children {
            value += self.weight * child.value(record, query);
        }
        value
    }
}

impl std::fmt::Debug for ConfidenceSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfidenceSignal")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .field("children", &self.children)
            .field("verdict", &self.verdict.get())
            .finish_non_exhaustive()
    }
}

// --- 내장 시그널 검사 ---

/// 원본 제품명이 설명 텍스트에 부분 문자열로 존재하는지 검사합니다.
///
/// 제품명이 비어 있으면 false입니다.
pub fn product_in_summary(record: &CveRecord, query: &CveQuery) -> bool {
    if query.raw_product().is_empty() {
        return false;
    }
    record
        .summary()
        .is_some_and(|summary| summary.contains(query.raw_product()))
}

/// 어떤 구조적 엔트리의 CPE 제품이 질의 제품과 매칭되는지 검사합니다.
pub fn product_in_cpe(record: &CveRecord, query: &CveQuery) -> bool {
    record
        .cpe_entries()
        .filter_map(|entry| entry.cpe())
        .any(|cpe| query.product_matches(&cpe.product))
}

/// 어떤 구조적 엔트리의 CPE 벤더가 질의 벤더와 일치하는지 검사합니다.
///
/// 구조적 엔트리가 하나도 없으면 false입니다. 엔트리가 있고 질의 벤더가
/// 지정되지 않았으면 공허하게 참입니다.
pub fn vendor_in_cpe(record: &CveRecord, query: &CveQuery) -> bool {
    let mut entries = record.cpe_entries().peekable();
    if entries.peek().is_none() {
        return false;
    }
    if query.vendor().is_empty() {
        return true;
    }
    entries
        .filter_map(|entry| entry.cpe())
        .any(|cpe| cpe.vendor == query.vendor())
}

/// 질의 버전이 어떤 구조적 엔트리의 취약 구간에 포함되는지 검사합니다.
pub fn version_in_cpe_range(record: &CveRecord, query: &CveQuery) -> bool {
    record
        .cpe_entries()
        .any(|entry| entry.is_in_range(query.version()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::version::Version;

    use super::*;

    fn query(vendor: &str, product: &str, version: &str) -> CveQuery {
        CveQuery::new(vendor, product, Version::parse(version).unwrap(), false).unwrap()
    }

    fn record_with_summary(summary: &str) -> CveRecord {
        serde_json::from_str(&format!(
            r#"{{ "cve": {{ "CVE_data_meta": {{ "ID": "CVE-2024-0001" }},
                 "description": {{ "description_data": [ {{ "lang": "en", "value": "{summary}" }} ] }} }} }}"#
        ))
        .unwrap()
    }

    fn record_with_entry(uri: &str, end_excluding: Option<&str>) -> CveRecord {
        let bound = end_excluding
            .map(|b| format!(r#", "versionEndExcluding": "{b}""#))
            .unwrap_or_default();
        serde_json::from_str(&format!(
            r#"{{ "configurations": {{ "nodes": [ {{ "operator": "OR",
                 "cpe_match": [ {{ "vulnerable": true, "cpe23Uri": "{uri}"{bound} }} ] }} ] }} }}"#
        ))
        .unwrap()
    }

    #[test]
    fn signal_memoizes_verdict() {
        // P7: 두 번째 평가는 검사 함수를 다시 호출하지 않음
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let signal = ConfidenceSignal::new(
            "counted",
            0.5,
            Box::new(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
        );

        let record = CveRecord::default();
        let q = query("", "nginx", "1.0");

        assert!(signal.is_confident(&record, &q));
        assert!(signal.is_confident(&record, &q));
        assert_eq!(signal.value(&record, &q), 0.5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn value_is_zero_when_not_confident() {
        let signal = ConfidenceSignal::new("never", 0.9, Box::new(|_, _| false));
        let record = CveRecord::default();
        let q = query("", "nginx", "1.0");
        assert_eq!(signal.value(&record, &q), 0.0);
    }

    #[test]
    fn child_contributes_scaled_by_parent_weight() {
        let signal = ConfidenceSignal::new("parent", 0.35, Box::new(|_, _| true))
            .with_child(ConfidenceSignal::new("child", 0.4, Box::new(|_, _| true)));
        let record = CveRecord::default();
        let q = query("", "nginx", "1.0");

        let value = signal.value(&record, &q);
        assert!((value - (0.35 + 0.35 * 0.4)).abs() < 1e-9);
    }

    #[test]
    fn child_is_gated_behind_parent() {
        let child_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&child_calls);
        let signal = ConfidenceSignal::new("parent", 0.35, Box::new(|_, _| false)).with_child(
            ConfidenceSignal::new(
                "child",
                0.4,
                Box::new(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    true
                }),
            ),
        );
        let record = CveRecord::default();
        let q = query("", "nginx", "1.0");

        assert_eq!(signal.value(&record, &q), 0.0);
        // 부모가 성립하지 않으면 하위 시그널은 평가되지 않음
        assert_eq!(child_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn product_in_summary_substring() {
        let record = record_with_summary("nginx before 1.19.0 allows DNS spoofing");
        assert!(product_in_summary(&record, &query("", "nginx", "1.18.0")));
        assert!(!product_in_summary(&record, &query("", "apache", "1.18.0")));
    }

    #[test]
    fn product_in_summary_empty_product_is_false() {
        let record = record_with_summary("anything");
        assert!(!product_in_summary(&record, &query("", "", "1.0")));
    }

    #[test]
    fn product_in_summary_missing_description_is_false() {
        let record = CveRecord::default();
        assert!(!product_in_summary(&record, &query("", "nginx", "1.0")));
    }

    #[test]
    fn product_in_cpe_exact_match() {
        let record = record_with_entry("cpe:2.3:a:f5:nginx:*:*:*:*:*:*:*:*", Some("1.19.0"));
        assert!(product_in_cpe(&record, &query("", "nginx", "1.18.0")));
        assert!(!product_in_cpe(&record, &query("", "apache", "1.18.0")));
    }

    #[test]
    fn product_in_cpe_no_entries_is_false() {
        let record = CveRecord::default();
        assert!(!product_in_cpe(&record, &query("", "nginx", "1.18.0")));
    }

    #[test]
    fn product_in_cpe_normalized_pattern() {
        let record = record_with_entry("cpe:2.3:a:f5:nginx_plus:*:*:*:*:*:*:*:*", None);
        let q = CveQuery::new("", "NGINX Plus", Version::parse("1.0").unwrap(), true).unwrap();
        assert!(product_in_cpe(&record, &q));
    }

    #[test]
    fn vendor_in_cpe_matches_and_vacuous_truth() {
        let record = record_with_entry("cpe:2.3:a:f5:nginx:*:*:*:*:*:*:*:*", Some("1.19.0"));
        assert!(vendor_in_cpe(&record, &query("f5", "nginx", "1.18.0")));
        assert!(!vendor_in_cpe(&record, &query("apache", "nginx", "1.18.0")));
        // 벤더 미지정 + 엔트리 존재 → 공허한 참
        assert!(vendor_in_cpe(&record, &query("", "nginx", "1.18.0")));
    }

    #[test]
    fn vendor_in_cpe_no_entries_is_false() {
        // 엔트리가 없으면 벤더 미지정이라도 false
        let record = CveRecord::default();
        assert!(!vendor_in_cpe(&record, &query("", "nginx", "1.18.0")));
    }

    #[test]
    fn version_in_cpe_range_checks_entries() {
        let record = record_with_entry("cpe:2.3:a:f5:nginx:*:*:*:*:*:*:*:*", Some("1.19.0"));
        assert!(version_in_cpe_range(&record, &query("", "nginx", "1.18.0")));
        assert!(!version_in_cpe_range(&record, &query("", "nginx", "1.19.0")));
    }

    #[test]
    fn malformed_cpe_degrades_to_false() {
        let record = record_with_entry("garbage-uri", None);
        assert!(!product_in_cpe(&record, &query("", "nginx", "1.18.0")));
        assert!(!version_in_cpe_range(&record, &query("", "nginx", "1.18.0")));
    }
}
