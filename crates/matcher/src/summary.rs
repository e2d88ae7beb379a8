//! 설명 텍스트 버전 추출 — 관계 패턴 규칙 기반 스캐너
//!
//! [`SummaryScanner`]는 자연어 설명에서 버전 토큰과 관계 구문을 찾아
//! 대상 버전이 언급된 범위에 해당하는지 판정합니다.
//!
//! # 규칙 우선순위
//!
//! 규칙은 고정된 우선순위로 평가되며, 관계가 성립하는 첫 규칙이 이깁니다:
//!
//! 1. [`Relation::Between`] — `"A through B"`, `"between A and B"` 등 범위 구문
//! 2. [`Relation::Before`] — `"prior to A"`, `"before A"`, `"< A"` 등
//! 3. [`Relation::After`] — `"after A"`, `"> A"` 등
//! 4. [`Relation::Enumerated`] — 위에 걸리지 않은 순수 버전 토큰
//!
//! 범위 구문은 순수 토큰보다 엄격하게 많은 정보를 담으므로 먼저 시도해야
//! 합니다. 그러지 않으면 순수 토큰 매칭이 더 정밀한 경계 조건을 가려버립니다.
//!
//! 버전 토큰은 공통 패턴(`v` 접두어 선택 + 숫자 + 비공백)으로 뽑은 뒤
//! 둘레 문장부호를 깎아내고, 유효한 버전으로 파싱되는 것만 남깁니다.
//! 파싱 불가 토큰은 조용히 버려집니다 — 에러가 아닙니다.

use regex::Regex;
use tracing::debug;

use crate::error::MatcherError;
use crate::version::Version;

/// 토큰 둘레에서 깎아낼 문자들 (문장부호 + `v`/`x` 접두어)
const TOKEN_TRIM_CHARS: &str = "!\"#$%&'()*+, -./:;<=>?@[\\]^_`{|}~vx";

/// 설명 텍스트에서 발견된 버전 관계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// 두 끝점 사이 범위 구문
    Between,
    /// 특정 버전 이전
    Before,
    /// 특정 버전 이후
    After,
    /// 관계 구문 없이 열거된 버전
    Enumerated,
}

impl Relation {
    /// 추출된 버전 집합에 대해 대상 버전이 이 관계를 만족하는지 검사합니다.
    fn holds(&self, versions: &[Version], target: &Version) -> bool {
        if versions.is_empty() {
            return false;
        }
        match self {
            Relation::Between => {
                // 집합의 최소/최대를 구간 끝점으로 사용
                let min = versions.iter().min();
                let max = versions.iter().max();
                match (min, max) {
                    (Some(min), Some(max)) => min <= target && target <= max,
                    _ => false,
                }
            }
            Relation::Before => versions.iter().any(|v| target < v),
            Relation::After => versions.iter().any(|v| target > v),
            Relation::Enumerated => versions.contains(target),
        }
    }
}

struct RelationRule {
    relation: Relation,
    patterns: Vec<Regex>,
}

/// 스캔 결과 — 성립한 관계와 그 규칙이 추출한 버전 집합
#[derive(Debug, Clone)]
pub struct SummaryHit {
    /// 성립한 관계
    pub relation: Relation,
    /// 해당 규칙이 추출한 버전들 (정렬, 중복 제거)
    pub versions: Vec<Version>,
}

/// 설명 텍스트 스캐너
///
/// 규칙의 정규식은 생성 시 한 번만 컴파일됩니다.
pub struct SummaryScanner {
    rules: Vec<RelationRule>,
}

impl SummaryScanner {
    /// 내장 규칙 테이블을 컴파일하여 스캐너를 생성합니다.
    pub fn new() -> Result<Self, MatcherError> {
        let rule = |relation: Relation, patterns: &[&str]| -> Result<RelationRule, MatcherError> {
            let compiled = patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| {
                        MatcherError::Pattern(format!("failed to compile rule pattern '{p}': {e}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RelationRule {
                relation,
                patterns: compiled,
            })
        };

        Ok(Self {
            rules: vec![
                rule(
                    Relation::Between,
                    &[
                        r"(?i)\b(v?\d\S*)\s+through\s+(v?\d\S*)",
                        r"(?i)\bversions?\s+(v?\d\S*)\s+(?:and|to|through)\s+(v?\d\S*)",
                        r"(?i)\bbetween\s+(?:versions?\s+)?(v?\d\S*)\s+(?:and|to|through)\s+(v?\d\S*)",
                        r"(?i)\bbefore\s+(?:versions?\s+)?(v?\d\S*)\s+and\s+after\s+(?:versions?\s+)?(v?\d\S*)",
                        r"(?i)\bafter\s+(?:versions?\s+)?(v?\d\S*)\s+and\s+before\s+(?:versions?\s+)?(v?\d\S*)",
                    ],
                )?,
                rule(
                    Relation::Before,
                    &[
                        r"(?i)\b(?:prior\s+to|prior|before|below|earlier\s+than)\s+(?:versions?\s+)?(v?\d\S*)",
                        r"(?i)<=?\s*(v?\d\S*)",
                        r"(?i)\b(v?\d\S*)\s+(?:\()?and\s+(?:below|earlier|prior|before)(?:\))?",
                    ],
                )?,
                rule(
                    Relation::After,
                    &[
                        r"(?i)\bafter\s+(?:versions?\s+)?(v?\d\S*)",
                        r"(?i)>=?\s*(v?\d\S*)",
                        r"(?i)\b(v?\d\S*)\s+(?:\()?and\s+(?:later|above|newer)(?:\))?",
                    ],
                )?,
                rule(Relation::Enumerated, &[r"(?i)(?:^|\s)(v?\d\S*)"])?,
            ],
        })
    }

    /// 설명 텍스트에서 대상 버전이 언급된 범위에 드는지 검사합니다.
    ///
    /// 관계가 성립하는 첫 규칙의 [`SummaryHit`]을 반환합니다. 어떤 규칙도
    /// 성립하지 않거나 유효한 버전 토큰이 없으면 `None`입니다.
    pub fn scan(&self, summary: &str, target: &Version) -> Option<SummaryHit> {
        for rule in &self.rules {
            let versions = extract_versions(&rule.patterns, summary);
            if rule.relation.holds(&versions, target) {
                debug!(
                    relation = ?rule.relation,
                    versions = versions.len(),
                    %target,
                    "summary relation holds"
                );
                return Some(SummaryHit {
                    relation: rule.relation,
                    versions,
                });
            }
        }
        None
    }
}

/// 규칙의 모든 패턴이 캡처한 토큰을 버전으로 파싱합니다.
///
/// 둘레 문장부호와 `v`/`x` 접두어를 깎아낸 뒤 파싱에 성공한 토큰만
/// 남기고 정렬/중복 제거합니다.
fn extract_versions(patterns: &[Regex], text: &str) -> Vec<Version> {
    let mut versions = Vec::new();
    for pattern in patterns {
        for captures in pattern.captures_iter(text) {
            for group in captures.iter().skip(1).flatten() {
                let token = group.as_str().trim_matches(|c| TOKEN_TRIM_CHARS.contains(c));
                if token.is_empty() {
                    continue;
                }
                if let Ok(version) = Version::parse(token) {
                    versions.push(version);
                }
            }
        }
    }
    versions.sort();
    versions.dedup();
    versions
}
