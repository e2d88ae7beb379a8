//! 질의 모델 — 불변 검색 키와 제품명 정규화
//!
//! [`CveQuery`]는 (벤더, 제품, 버전, 정규화 모드) 4개 필드로 이루어진
//! 불변 검색 키입니다. 동등성과 해시는 저장된 4개 필드로 정의되므로
//! 동일한 질의를 호출자가 중복 제거할 수 있습니다.
//!
//! `normalize` 모드에서는 느슨하게 표기된 설치 애플리케이션 이름
//! (`"My App!"`)이 정식 제품 식별자(`"my_app"`)와 매칭되도록
//! [`normalize_product_name`]으로 관대한 검색 패턴을 만듭니다.
//! 이 정규화는 검색 패턴을 만들 때만 쓰이는 단방향 변환이며,
//! 정확한 동등 비교에는 절대 사용되지 않습니다.

use std::fmt;
use std::hash::{Hash, Hasher};

use regex::Regex;

use crate::error::MatcherError;
use crate::version::Version;

/// 선택적 단일 구분자로 치환되는 고정 문장부호 집합
const PRODUCT_PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// 불변 CVE 검색 질의
#[derive(Debug, Clone)]
pub struct CveQuery {
    vendor: String,
    raw_product: String,
    product: String,
    version: Version,
    normalize: bool,
    /// normalize 모드에서만 존재하는, 전체 일치로 앵커된 제품 패턴
    product_pattern: Option<Regex>,
}

impl CveQuery {
    /// 새 질의를 생성합니다.
    ///
    /// `normalize`가 true면 제품명을 관대한 패턴으로 정규화하고
    /// 생성 시점에 한 번 컴파일합니다. 이후 질의는 불변입니다.
    pub fn new(
        vendor: impl Into<String>,
        product: impl Into<String>,
        version: Version,
        normalize: bool,
    ) -> Result<Self, MatcherError> {
        let vendor = vendor.into();
        let raw_product = product.into();

        let (product, product_pattern) = if normalize {
            let normalized = normalize_product_name(&raw_product);
            let pattern =
                Regex::new(&format!("^(?:{normalized})$")).map_err(|e| MatcherError::Query {
                    field: "product".to_owned(),
                    reason: format!("failed to compile normalized pattern: {e}"),
                })?;
            (normalized, Some(pattern))
        } else {
            (raw_product.clone(), None)
        };

        Ok(Self {
            vendor,
            raw_product,
            product,
            version,
            normalize,
            product_pattern,
        })
    }

    /// 질의 벤더명
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// 원본 제품명 (정규화 전)
    pub fn raw_product(&self) -> &str {
        &self.raw_product
    }

    /// 파생 제품명 — normalize 모드면 패턴, 아니면 원본 그대로
    pub fn product(&self) -> &str {
        &self.product
    }

    /// 질의 대상 버전
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// 정규화 모드 여부
    pub fn is_normalized(&self) -> bool {
        self.normalize
    }

    /// CPE 제품 필드가 이 질의의 제품과 매칭되는지 검사합니다.
    ///
    /// normalize 모드면 앵커된 패턴 전체 일치, 아니면 정확한 동등 비교입니다.
    pub fn product_matches(&self, candidate: &str) -> bool {
        match &self.product_pattern {
            Some(pattern) => pattern.is_match(candidate),
            None => self.product == candidate,
        }
    }
}

impl PartialEq for CveQuery {
    fn eq(&self, other: &Self) -> bool {
        self.vendor == other.vendor
            && self.raw_product == other.raw_product
            && self.version == other.version
            && self.normalize == other.normalize
    }
}

impl Eq for CveQuery {}

impl Hash for CveQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vendor.hash(state);
        self.raw_product.hash(state);
        self.version.hash(state);
        self.normalize.hash(state);
    }
}

impl fmt::Display for CveQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {}",
            if self.vendor.is_empty() {
                "*"
            } else {
                self.vendor.as_str()
            },
            self.raw_product,
            self.version,
        )
    }
}

/// 제품명을 관대한 검색 패턴 조각으로 정규화합니다.
///
/// 소문자화한 이름의 각 문자를 다음 규칙으로 치환합니다:
/// - 고정 문장부호 → 선택적 단일 구분자 (`[\W_]?`)
/// - 공백 → 임의 문자 0-3개 (`.{0,3}`)
/// - `*` → 임의 문자 1개 (`.`)
/// - 영숫자 → 그대로
///
/// 결과는 검색 패턴 조각으로만 사용합니다. 문자를 새로 만들어내지는
/// 않으므로 `"my app!"`의 패턴이 `"myapp2"` 같은 문자열과 전체 일치하지는
/// 않습니다.
pub fn normalize_product_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() * 2);
    for c in name.to_lowercase().chars() {
        if c == ' ' {
            out.push_str(".{0,3}");
        } else if c == '*' {
            out.push('.');
        } else if PRODUCT_PUNCTUATION.contains(c) {
            out.push_str(r"[\W_]?");
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push_str(&regex::escape(&c.to_string()));
        }
    }
    out
}
