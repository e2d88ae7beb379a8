//! 버전 모델 — 세그먼트 단위 전순서 비교
//!
//! [`Version`]은 점/대시/플러스로 구분된 버전 문자열을 숫자/레이블 세그먼트
//! 시퀀스로 파싱합니다. 숫자 세그먼트는 수치로 비교하므로
//! `"1.9" < "1.10"`이 성립합니다 (문자열 비교가 아님).
//!
//! 파싱 실패는 별도의 `Err` 상태입니다. 파싱할 수 없는 버전은 비교에서
//! 제외되며, 절대 0으로 강제 변환되지 않습니다.
//!
//! # 센티널
//!
//! [`Version::floor`]와 [`Version::ceiling`]은 모든 실제 버전보다
//! 각각 아래/위로 정렬되는 센티널입니다. 실제 버전 `"0"`과 충돌하지 않도록
//! 별도 variant로 표현합니다 (문자열 `"0"`이나 큰 수가 아님).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::MatcherError;

/// 버전 세그먼트 하나
///
/// derive된 `Ord`에 의해 숫자 세그먼트가 레이블 세그먼트보다 앞에 정렬됩니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Segment {
    Number(u64),
    Label(String),
}

#[derive(Debug, Clone)]
enum Repr {
    /// 모든 실제 버전보다 작은 센티널
    Floor,
    /// 파싱된 실제 버전
    Parsed { raw: String, segments: Vec<Segment> },
    /// 모든 실제 버전보다 큰 센티널
    Ceiling,
}

/// 전순서 비교가 가능한 버전
#[derive(Debug, Clone)]
pub struct Version {
    repr: Repr,
}

impl Version {
    /// 버전 문자열을 파싱합니다.
    ///
    /// 선행 `v` 접두어는 무시합니다 (`"v1.2.3"`). 첫 글자가 숫자가 아니면
    /// 에러입니다. 비교 일관성을 위해 뒤따르는 `.0` 세그먼트는 정규화
    /// 단계에서 제거되므로 `"1.0"`과 `"1"`은 같은 버전입니다.
    pub fn parse(input: &str) -> Result<Self, MatcherError> {
        let lowered = input.trim().to_lowercase();
        let body = match lowered.strip_prefix('v') {
            Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
            _ => lowered.as_str(),
        };

        if body.is_empty() {
            return Err(MatcherError::VersionParse {
                version: input.to_owned(),
                reason: "empty version string".to_owned(),
            });
        }
        if !body.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(MatcherError::VersionParse {
                version: input.to_owned(),
                reason: "must start with a digit".to_owned(),
            });
        }

        let segments = split_segments(body);
        if segments.is_empty() {
            return Err(MatcherError::VersionParse {
                version: input.to_owned(),
                reason: "no comparable segments".to_owned(),
            });
        }

        Ok(Self {
            repr: Repr::Parsed {
                raw: body.to_owned(),
                segments,
            },
        })
    }

    /// 모든 실제 버전보다 작은 센티널을 반환합니다.
    pub fn floor() -> Self {
        Self { repr: Repr::Floor }
    }

    /// 모든 실제 버전보다 큰 센티널을 반환합니다.
    pub fn ceiling() -> Self {
        Self {
            repr: Repr::Ceiling,
        }
    }

    /// 이 버전이 floor 센티널인지 여부
    pub fn is_floor(&self) -> bool {
        matches!(self.repr, Repr::Floor)
    }

    /// 이 버전이 ceiling 센티널인지 여부
    pub fn is_ceiling(&self) -> bool {
        matches!(self.repr, Repr::Ceiling)
    }
}

/// 구분자(`.`/`-`/`+` 등 비영숫자)와 숫자/문자 경계에서 세그먼트를 나눕니다.
///
/// `"1.0.0rc1"` → `[1, 0, 0, "rc", 1]`
fn split_segments(body: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut digits = String::new();
    let mut letters = String::new();

    let flush_digits = |buf: &mut String, out: &mut Vec<Segment>| {
        if !buf.is_empty() {
            // u64 범위를 넘는 숫자 열은 레이블로 보존
            match buf.parse::<u64>() {
                Ok(n) => out.push(Segment::Number(n)),
                Err(_) => out.push(Segment::Label(buf.clone())),
            }
            buf.clear();
        }
    };

    for c in body.chars() {
        if c.is_ascii_digit() {
            if !letters.is_empty() {
                segments.push(Segment::Label(letters.clone()));
                letters.clear();
            }
            digits.push(c);
        } else if c.is_alphabetic() {
            flush_digits(&mut digits, &mut segments);
            letters.push(c);
        } else {
            flush_digits(&mut digits, &mut segments);
            if !letters.is_empty() {
                segments.push(Segment::Label(letters.clone()));
                letters.clear();
            }
        }
    }
    flush_digits(&mut digits, &mut segments);
    if !letters.is_empty() {
        segments.push(Segment::Label(letters));
    }

    // 뒤따르는 0 세그먼트 제거: "1.0"과 "1"을 같게 취급
    while segments.len() > 1 && segments.last() == Some(&Segment::Number(0)) {
        segments.pop();
    }

    segments
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.repr, &other.repr) {
            (Repr::Floor, Repr::Floor) | (Repr::Ceiling, Repr::Ceiling) => Ordering::Equal,
            (Repr::Floor, _) | (_, Repr::Ceiling) => Ordering::Less,
            (_, Repr::Floor) | (Repr::Ceiling, _) => Ordering::Greater,
            (Repr::Parsed { segments: a, .. }, Repr::Parsed { segments: b, .. }) => a.cmp(b),
        }
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.repr {
            Repr::Floor => 0u8.hash(state),
            Repr::Parsed { segments, .. } => {
                1u8.hash(state);
                segments.hash(state);
            }
            Repr::Ceiling => 2u8.hash(state),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Repr::Floor => write!(f, "floor"),
            Repr::Parsed { raw, .. } => write!(f, "{raw}"),
            Repr::Ceiling => write!(f, "ceiling"),
        }
    }
}

impl FromStr for Version {
    type Err = MatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}
