//! CPE 2.3 식별자 파싱 및 버전 범위 해석
//!
//! [`CpeUri`]는 `cpe:2.3:` 접두어가 붙은 식별자 문자열을 11개 속성 필드로
//! 파싱합니다. [`CpeMatchEntry`]는 CPE와 버전 경계를 묶어 "이 제품은
//! 이 버전 구간에서 취약하다"를 주장하는 구조적 매칭 엔트리입니다.
//!
//! # 범위 해석 규칙
//!
//! 유효 구간 `[min, max]`는 (a) CPE에 내장된 정확한 버전(파싱 가능할 때)과
//! (b) 명시적 시작/끝 경계의 교집합입니다. 경계가 전혀 없고 CPE 버전이
//! 와일드카드인 엔트리는 "무제한"이며, 어떤 구체적 버전과도 매칭되지
//! 않습니다 — 사용 가능한 범위를 전혀 명시하지 않은 엔트리로부터
//! 오탐을 만들지 않기 위한 규칙입니다.
//!
//! `versionStartExcluding`/`versionEndExcluding`은 구간 클램프에 참여하고,
//! 추가로 개구간 검사(`<`/`>`)로 적용됩니다.

use serde::{Deserialize, Serialize};

use crate::error::MatcherError;
use crate::version::Version;

/// 제약 없음을 뜻하는 CPE 속성 값
pub const CPE_WILDCARD: &str = "*";

/// 해당 없음을 뜻하는 CPE 속성 값
pub const CPE_NA: &str = "-";

/// 접두어를 제외하고 최소로 요구되는 속성 세그먼트 수 (part..language)
const MIN_CPE_COMPONENTS: usize = 7;

/// CPE 2.3 속성 필드 수
const CPE_COMPONENTS: usize = 11;

/// 파싱된 CPE 2.3 식별자
///
/// `cpe:2.3:part:vendor:product:version:update:edition:language:sw_edition:target_sw:target_hw:other`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpeUri {
    /// 파트 (`a` 애플리케이션, `o` 운영체제, `h` 하드웨어)
    pub part: String,
    /// 벤더명
    pub vendor: String,
    /// 제품명
    pub product: String,
    /// 버전 문자열 (`*` 제약 없음, `-` 해당 없음)
    pub version: String,
    /// 업데이트/패치 레벨
    pub update: String,
    /// 에디션
    pub edition: String,
    /// 언어
    pub language: String,
    /// 소프트웨어 에디션
    pub sw_edition: String,
    /// 대상 소프트웨어
    pub target_sw: String,
    /// 대상 하드웨어
    pub target_hw: String,
    /// 기타 속성
    pub other: String,
}

impl CpeUri {
    /// CPE 2.3 식별자 문자열을 파싱합니다.
    ///
    /// 이스케이프되지 않은 `:`에서만 분리하며, 접두어 뒤 속성 세그먼트가
    /// 7개 미만이면 에러입니다 — 부분 파싱으로 넘어가지 않습니다.
    /// 8번째 이후 속성(sw_edition..other)은 생략 시 `*`로 채웁니다.
    pub fn parse(uri: &str) -> Result<Self, MatcherError> {
        let body = uri.strip_prefix("cpe:2.3:").ok_or_else(|| MatcherError::CpeParse {
            uri: uri.to_owned(),
            reason: "missing 'cpe:2.3:' prefix".to_owned(),
        })?;

        let mut parts = split_unescaped(body);
        if parts.len() < MIN_CPE_COMPONENTS {
            return Err(MatcherError::CpeParse {
                uri: uri.to_owned(),
                reason: format!(
                    "expected at least {MIN_CPE_COMPONENTS} components, found {}",
                    parts.len()
                ),
            });
        }
        parts.resize(CPE_COMPONENTS, CPE_WILDCARD.to_owned());

        let mut fields = parts.into_iter();
        // resize로 11개가 보장되므로 순서대로 소비
        Ok(Self {
            part: fields.next().unwrap_or_default(),
            vendor: fields.next().unwrap_or_default(),
            product: fields.next().unwrap_or_default(),
            version: fields.next().unwrap_or_default(),
            update: fields.next().unwrap_or_default(),
            edition: fields.next().unwrap_or_default(),
            language: fields.next().unwrap_or_default(),
            sw_edition: fields.next().unwrap_or_default(),
            target_sw: fields.next().unwrap_or_default(),
            target_hw: fields.next().unwrap_or_default(),
            other: fields.next().unwrap_or_default(),
        })
    }

    /// 버전 필드에 내장된 구체적 버전을 반환합니다.
    ///
    /// 와일드카드(`*`), 해당 없음(`-`), 파싱 불가 값은 `None`입니다.
    pub fn embedded_version(&self) -> Option<Version> {
        if self.version == CPE_WILDCARD || self.version == CPE_NA {
            return None;
        }
        Version::parse(&self.version).ok()
    }
}

/// 이스케이프(`\:`)를 존중하며 `:`로 분리하고, `\x` 시퀀스를 복원합니다.
fn split_unescaped(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in body.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == ':' {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts
}

/// 구조적 매칭 엔트리 — CPE + 버전 경계
///
/// NVD 레코드의 `configurations.nodes[].cpe_match[]` 항목에서
/// 역직렬화됩니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpeMatchEntry {
    /// 이 엔트리가 취약 구간을 주장하는지 여부
    #[serde(default)]
    pub vulnerable: bool,
    /// CPE 2.3 식별자 문자열
    #[serde(default, rename = "cpe23Uri")]
    pub cpe23_uri: String,
    /// 시작 경계 (포함)
    #[serde(default, rename = "versionStartIncluding")]
    pub version_start_including: Option<String>,
    /// 시작 경계 (제외)
    #[serde(default, rename = "versionStartExcluding")]
    pub version_start_excluding: Option<String>,
    /// 끝 경계 (포함)
    #[serde(default, rename = "versionEndIncluding")]
    pub version_end_including: Option<String>,
    /// 끝 경계 (제외)
    #[serde(default, rename = "versionEndExcluding")]
    pub version_end_excluding: Option<String>,
}

impl CpeMatchEntry {
    /// CPE 식별자를 파싱해 반환합니다. 손상된 식별자는 `None`입니다.
    pub fn cpe(&self) -> Option<CpeUri> {
        CpeUri::parse(&self.cpe23_uri).ok()
    }

    /// 이 엔트리가 나타내는 유효 버전 구간 `[min, max]`를 계산합니다.
    ///
    /// `min`은 내장 버전과 시작 경계의 최댓값, `max`는 내장 버전과 끝
    /// 경계의 최솟값입니다. 경계가 없으면 floor/ceiling 센티널이 남습니다.
    pub fn resolve_range(&self) -> (Version, Version) {
        let embedded = self.cpe().and_then(|cpe| cpe.embedded_version());

        let parse_bound = |bound: &Option<String>| -> Option<Version> {
            bound.as_deref().and_then(|s| Version::parse(s).ok())
        };

        let mut min = Version::floor();
        let mut max = Version::ceiling();

        if let Some(v) = &embedded {
            min = min.max(v.clone());
            max = max.min(v.clone());
        }
        if let Some(v) = parse_bound(&self.version_start_including) {
            min = min.max(v);
        }
        if let Some(v) = parse_bound(&self.version_start_excluding) {
            min = min.max(v);
        }
        if let Some(v) = parse_bound(&self.version_end_including) {
            max = max.min(v);
        }
        if let Some(v) = parse_bound(&self.version_end_excluding) {
            max = max.min(v);
        }

        (min, max)
    }

    /// 주어진 버전이 취약 구간에 포함되는지 검사합니다.
    ///
    /// 무제한 엔트리(`[floor, ceiling]`)는 항상 `false`입니다. 제외 경계는
    /// 개구간으로 적용되어 경계값 자체는 매칭되지 않습니다.
    pub fn is_in_range(&self, version: &Version) -> bool {
        let (min, max) = self.resolve_range();
        if min.is_floor() && max.is_ceiling() {
            return false;
        }
        if *version < min || *version > max {
            return false;
        }

        let excluded_by = |bound: &Option<String>, after: bool| -> bool {
            match bound.as_deref().and_then(|s| Version::parse(s).ok()) {
                Some(b) => {
                    if after {
                        *version >= b
                    } else {
                        *version <= b
                    }
                }
                None => false,
            }
        };
        if excluded_by(&self.version_start_excluding, false) {
            return false;
        }
        if excluded_by(&self.version_end_excluding, true) {
            return false;
        }

        true
    }
}
