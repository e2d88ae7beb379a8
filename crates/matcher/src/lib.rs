#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: 도메인 에러 타입 (`MatcherError`)
//! - [`config`]: 엔진 설정 (`MatcherConfig`, `SignalWeights`, 빌더)
//! - [`version`]: 전순서 버전 모델 (`Version`, floor/ceiling 센티널)
//! - [`cpe`]: CPE 2.3 파싱과 범위 해석 (`CpeUri`, `CpeMatchEntry`)
//! - [`record`]: 원시 취약점 레코드 모델 (`CveRecord`)
//! - [`query`]: 검색 질의 (`CveQuery`, `normalize_product_name`)
//! - [`telemetry`]: 질의 소스 (`QuerySource`, `OsVersion`, `InstalledApplication`)
//! - [`summary`]: 설명 텍스트 버전 추출 (`SummaryScanner`)
//! - [`confidence`]: 신뢰도 시그널 (`ConfidenceSignal`)
//! - [`matcher`]: 엔진과 집계 (`CveMatcher`, `CveMatch`, `CandidateSource`)
//!
//! # Architecture
//!
//! ```text
//! CveQuery --> CandidateSource --> CveRecord 스트림
//!                                      |
//!                                 CveMatcher::search
//!                                      |
//!                    +-----------------+------------------+
//!                    |                 |                  |
//!             SummaryScanner     CpeMatchEntry       CveQuery 비교
//!             (텍스트 시그널)     (구조 시그널)       (제품/벤더 시그널)
//!                    |                 |                  |
//!                    +-----------------+------------------+
//!                                      |
//!                              CveMatch (score)
//!                                      |
//!                            threshold 필터 --> 호출자
//! ```

pub mod confidence;
pub mod config;
pub mod cpe;
pub mod error;
pub mod matcher;
pub mod query;
pub mod record;
pub mod summary;
pub mod telemetry;
pub mod version;

// --- Public API Re-exports ---

// 엔진
pub use matcher::{CandidateFilter, CandidateSource, CveMatch, CveMatcher, SignalScore};

// 설정
pub use config::{MatcherConfig, MatcherConfigBuilder, SignalWeights};

// 에러
pub use error::MatcherError;

// 데이터 모델
pub use cpe::{CpeMatchEntry, CpeUri};
pub use query::{CveQuery, normalize_product_name};
pub use record::CveRecord;
pub use version::Version;

// 텍스트 추출
pub use summary::{Relation, SummaryHit, SummaryScanner};

// 시그널
pub use confidence::ConfidenceSignal;

// 텔레메트리
pub use telemetry::{InstalledApplication, OsVersion, QuerySource};
