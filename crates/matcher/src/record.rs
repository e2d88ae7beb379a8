//! 취약점 레코드 모델 — NVD 1.1 피드 형태의 원시 레코드
//!
//! [`CveRecord`]는 외부 후보 검색 계층이 넘겨주는 원시 취약점 레코드를
//! 나타냅니다. 엔진이 읽는 필드(식별자, 설명 텍스트, 구조적 매칭 엔트리,
//! CVSS 블록)만 모델링하며, 나머지 피드 필드는 무시됩니다.
//!
//! 레코드에 기대하는 필드가 없어도 역직렬화는 실패하지 않습니다.
//! `configurations`가 없는 레코드는 구조적 엔트리 0개로 취급되고,
//! 설명이 없는 레코드는 텍스트 기반 시그널이 false가 됩니다.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

use cvescope_core::types::Severity;

use crate::cpe::CpeMatchEntry;

/// NVD 피드 날짜 형식 (`2021-04-01T20:15Z`)
const FEED_DATE_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// 원시 취약점 레코드 하나
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CveRecord {
    /// CVE 본문 (메타데이터 + 설명)
    #[serde(default)]
    pub cve: CveDetail,
    /// 적용 구성 노드 트리
    #[serde(default)]
    pub configurations: Configurations,
    /// CVSS 영향도 블록
    #[serde(default)]
    pub impact: Impact,
    /// 공개 일시 (피드 문자열 그대로)
    #[serde(default, rename = "publishedDate")]
    pub published_date: Option<String>,
    /// 최종 수정 일시 (피드 문자열 그대로)
    #[serde(default, rename = "lastModifiedDate")]
    pub last_modified_date: Option<String>,
}

/// CVE 본문
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CveDetail {
    /// CVE 메타데이터
    #[serde(default, rename = "CVE_data_meta")]
    pub meta: CveMeta,
    /// 설명 블록
    #[serde(default)]
    pub description: DescriptionBlock,
}

/// CVE 메타데이터
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CveMeta {
    /// CVE ID (예: CVE-2021-23017)
    #[serde(default, rename = "ID")]
    pub id: String,
    /// 할당 기관
    #[serde(default, rename = "ASSIGNER")]
    pub assigner: String,
}

/// 설명 블록
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptionBlock {
    /// 언어별 설명 목록
    #[serde(default)]
    pub description_data: Vec<LangString>,
}

/// 언어 태그가 붙은 텍스트
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LangString {
    /// 언어 코드
    #[serde(default)]
    pub lang: String,
    /// 텍스트 값
    #[serde(default)]
    pub value: String,
}

/// 적용 구성 트리
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Configurations {
    /// 최상위 구성 노드 목록
    #[serde(default)]
    pub nodes: Vec<ConfigNode>,
}

/// 구성 노드 — OR/AND로 결합된 구조적 매칭 엔트리 그룹
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigNode {
    /// 결합 연산자 (`OR` / `AND`)
    #[serde(default)]
    pub operator: Option<String>,
    /// 중첩 자식 노드
    #[serde(default)]
    pub children: Vec<ConfigNode>,
    /// 이 노드의 구조적 매칭 엔트리
    #[serde(default)]
    pub cpe_match: Vec<CpeMatchEntry>,
}

/// CVSS 영향도 블록
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Impact {
    /// CVSS v3 메트릭
    #[serde(default, rename = "baseMetricV3")]
    pub base_metric_v3: Option<BaseMetricV3>,
    /// CVSS v2 메트릭
    #[serde(default, rename = "baseMetricV2")]
    pub base_metric_v2: Option<BaseMetricV2>,
}

/// CVSS v3 메트릭 블록
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseMetricV3 {
    /// CVSS v3 본문
    #[serde(default, rename = "cvssV3")]
    pub cvss_v3: CvssV3,
}

/// CVSS v3 본문
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvssV3 {
    /// 기본 점수 (0.0-10.0)
    #[serde(default, rename = "baseScore")]
    pub base_score: Option<f64>,
    /// 기본 심각도 문자열 (`"HIGH"` 등)
    #[serde(default, rename = "baseSeverity")]
    pub base_severity: Option<String>,
}

/// CVSS v2 메트릭 블록
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseMetricV2 {
    /// CVSS v2 본문
    #[serde(default, rename = "cvssV2")]
    pub cvss_v2: CvssV2,
    /// v2 블록에는 심각도가 메트릭 레벨에 있음
    #[serde(default)]
    pub severity: Option<String>,
}

/// CVSS v2 본문
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvssV2 {
    /// 기본 점수 (0.0-10.0)
    #[serde(default, rename = "baseScore")]
    pub base_score: Option<f64>,
}

impl CveRecord {
    /// CVE ID를 반환합니다.
    pub fn id(&self) -> &str {
        &self.cve.meta.id
    }

    /// 설명 텍스트를 반환합니다.
    ///
    /// 설명 목록의 첫 항목을 사용합니다. 설명이 없거나 비어 있으면
    /// `None`입니다.
    pub fn summary(&self) -> Option<&str> {
        self.cve
            .description
            .description_data
            .first()
            .map(|d| d.value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// 모든 구조적 매칭 엔트리를 순회합니다.
    ///
    /// OR/AND 자식 노드를 재귀적으로 평탄화합니다. `configurations`가
    /// 없는 레코드는 빈 시퀀스입니다.
    pub fn cpe_entries(&self) -> impl Iterator<Item = &CpeMatchEntry> {
        fn walk<'a>(node: &'a ConfigNode, out: &mut Vec<&'a CpeMatchEntry>) {
            out.extend(node.cpe_match.iter());
            for child in &node.children {
                walk(child, out);
            }
        }

        let mut entries = Vec::new();
        for node in &self.configurations.nodes {
            walk(node, &mut entries);
        }
        entries.into_iter()
    }

    /// CVSS 기본 점수를 반환합니다 (v3 우선, 없으면 v2).
    pub fn base_score(&self) -> Option<f64> {
        self.impact
            .base_metric_v3
            .as_ref()
            .and_then(|m| m.cvss_v3.base_score)
            .or_else(|| {
                self.impact
                    .base_metric_v2
                    .as_ref()
                    .and_then(|m| m.cvss_v2.base_score)
            })
    }

    /// CVSS 심각도 등급을 반환합니다.
    ///
    /// v3 `baseSeverity` 문자열을 우선 사용하고, 없으면 v2 `severity`,
    /// 그것도 없으면 기본 점수에서 유도합니다.
    pub fn severity(&self) -> Option<Severity> {
        let from_label = self
            .impact
            .base_metric_v3
            .as_ref()
            .and_then(|m| m.cvss_v3.base_severity.as_deref())
            .or_else(|| {
                self.impact
                    .base_metric_v2
                    .as_ref()
                    .and_then(|m| m.severity.as_deref())
            })
            .and_then(Severity::from_str_loose);

        from_label.or_else(|| self.base_score().map(Severity::from_score))
    }

    /// 공개 일시를 파싱해 반환합니다.
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        self.published_date.as_deref().and_then(parse_feed_date)
    }

    /// 최종 수정 일시를 파싱해 반환합니다.
    pub fn last_modified_at(&self) -> Option<DateTime<FixedOffset>> {
        self.last_modified_date.as_deref().and_then(parse_feed_date)
    }
}

/// NVD 피드 날짜 문자열을 파싱합니다.
///
/// 분 단위 피드 형식(`2021-04-01T20:15Z`)을 먼저 시도하고,
/// 실패하면 RFC 3339로 재시도합니다.
fn parse_feed_date(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, FEED_DATE_FORMAT) {
        return Some(naive.and_utc().fixed_offset());
    }
    DateTime::parse_from_rfc3339(s).ok()
}
