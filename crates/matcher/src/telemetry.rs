//! 텔레메트리 질의 소스 — 수집 데이터를 질의로 변환하는 확장 포인트
//!
//! 운영체제 버전, 설치 애플리케이션처럼 서로 다른 방식으로 수집된
//! 텔레메트리가 각자의 방식으로 [`CveQuery`]를 만들어냅니다.
//! 새로운 텔레메트리 종류를 지원하려면 [`QuerySource`]를 구현합니다.

use crate::error::MatcherError;
use crate::query::CveQuery;
use crate::version::Version;

/// 질의를 만들어낼 수 있는 텔레메트리 소스
pub trait QuerySource {
    /// 이 텔레메트리를 검색 질의로 변환합니다.
    fn to_query(&self) -> Result<CveQuery, MatcherError>;
}

/// 운영체제 버전 텔레메트리
///
/// 예: `OS = "Windows 11 Pro"`, `version = "24H2"`, `build = "10.0.26100.1742"`.
/// 제품 식별자는 OS 이름 앞 두 단어와 버전을 `_`로 이어 만듭니다
/// (`windows_11_24h2`).
#[derive(Debug, Clone)]
pub struct OsVersion {
    /// 운영체제 이름
    pub os: String,
    /// 마케팅/릴리스 버전
    pub version: String,
    /// 빌드 번호 (질의 버전으로 사용)
    pub build: String,
}

impl QuerySource for OsVersion {
    fn to_query(&self) -> Result<CveQuery, MatcherError> {
        let mut parts: Vec<&str> = self.os.split_whitespace().take(2).collect();
        parts.push(&self.version);
        let product = parts.join("_").to_lowercase();

        let version = Version::parse(&self.build)?;
        CveQuery::new("microsoft", product, version, false)
    }
}

/// 설치 애플리케이션 텔레메트리
///
/// 설치 목록의 표시 이름은 정식 제품 식별자와 표기가 다르므로
/// 정규화 모드로 질의를 만듭니다.
#[derive(Debug, Clone)]
pub struct InstalledApplication {
    /// 벤더명 (모르면 빈 문자열)
    pub vendor: String,
    /// 표시 이름
    pub name: String,
    /// 설치된 버전 문자열
    pub version: String,
}

impl QuerySource for InstalledApplication {
    fn to_query(&self) -> Result<CveQuery, MatcherError> {
        let version = Version::parse(&self.version)?;
        CveQuery::new(
            self.vendor.to_lowercase(),
            self.name.clone(),
            version,
            true,
        )
    }
}
