//! Response Code Families - Acceptance predicates over HTTP status codes
//!
//! A family is stored as the set of status codes it accepts, so two families
//! built differently (a class, a union of classes, an explicit list) compare
//! and hash equal whenever they accept the same codes.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

/// Lowest status code a family can accept
pub const MIN_STATUS: u16 = 100;
/// Highest status code a family can accept
pub const MAX_STATUS: u16 = 599;

/// Errors raised when parsing or building a family from untrusted input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FamilyError {
    #[error("invalid response code token '{0}'")]
    InvalidToken(String),

    #[error("status code {0} is outside {MIN_STATUS}-{MAX_STATUS}")]
    OutOfRange(u16),

    #[error("response code family is empty")]
    Empty,
}

/// Named HTTP status class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusClass {
    pub const ALL: [StatusClass; 5] = [
        Self::Informational,
        Self::Success,
        Self::Redirection,
        Self::ClientError,
        Self::ServerError,
    ];

    /// Inclusive code range of the class
    pub const fn range(self) -> (u16, u16) {
        match self {
            Self::Informational => (100, 199),
            Self::Success => (200, 299),
            Self::Redirection => (300, 399),
            Self::ClientError => (400, 499),
            Self::ServerError => (500, 599),
        }
    }

    /// Class a status code numerically belongs to
    pub fn of(code: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|class| {
            let (lo, hi) = class.range();
            (lo..=hi).contains(&code)
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Informational => "1XX",
            Self::Success => "2XX",
            Self::Redirection => "3XX",
            Self::ClientError => "4XX",
            Self::ServerError => "5XX",
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const WORDS: usize = 8;

/// Bitset over 100..=599
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CodeSet([u64; WORDS]);

impl CodeSet {
    const EMPTY: Self = Self([0; WORDS]);

    const fn slot(code: u16) -> (usize, u64) {
        let index = (code - MIN_STATUS) as usize;
        (index / 64, 1u64 << (index % 64))
    }

    const fn in_range(code: u16) -> bool {
        code >= MIN_STATUS && code <= MAX_STATUS
    }

    const fn with(self, code: u16) -> Self {
        if !Self::in_range(code) {
            return self;
        }
        let (word, mask) = Self::slot(code);
        let mut words = self.0;
        words[word] |= mask;
        Self(words)
    }

    const fn with_range(self, lo: u16, hi: u16) -> Self {
        let mut set = self;
        let mut code = lo;
        while code <= hi {
            set = set.with(code);
            code += 1;
        }
        set
    }

    const fn union(self, other: Self) -> Self {
        let mut words = self.0;
        let mut i = 0;
        while i < WORDS {
            words[i] |= other.0[i];
            i += 1;
        }
        Self(words)
    }

    const fn contains(&self, code: u16) -> bool {
        if !Self::in_range(code) {
            return false;
        }
        let (word, mask) = Self::slot(code);
        self.0[word] & mask != 0
    }

    fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }
}

/// An acceptable set of HTTP status outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponseCodeFamily {
    accepted: CodeSet,
}

impl ResponseCodeFamily {
    pub const INFORMATIONAL: Self = Self::class(StatusClass::Informational);
    pub const SUCCESS: Self = Self::class(StatusClass::Success);
    pub const REDIRECTION: Self = Self::class(StatusClass::Redirection);
    pub const CLIENT_ERROR: Self = Self::class(StatusClass::ClientError);
    pub const SERVER_ERROR: Self = Self::class(StatusClass::ServerError);
    /// Either rejected as invalid or accepted
    pub const CLIENT_OR_SUCCESS: Self = Self::CLIENT_ERROR.union(Self::SUCCESS);
    pub const AUTH_ERRORS: Self = Self::codes(&[401, 403]);
    pub const MEDIA_TYPE_ERRORS: Self = Self::codes(&[406, 415]);
    pub const NOT_FOUND_OR_VALIDATION: Self = Self::codes(&[400, 404, 422]);

    /// Family accepting one status class
    pub const fn class(class: StatusClass) -> Self {
        let (lo, hi) = class.range();
        Self {
            accepted: CodeSet::EMPTY.with_range(lo, hi),
        }
    }

    /// Family accepting an explicit set of codes; codes outside 100-599 are ignored
    pub const fn codes(codes: &[u16]) -> Self {
        let mut accepted = CodeSet::EMPTY;
        let mut i = 0;
        while i < codes.len() {
            accepted = accepted.with(codes[i]);
            i += 1;
        }
        Self { accepted }
    }

    /// Checked variant of [`Self::codes`] for untrusted input
    pub fn try_codes(codes: &[u16]) -> Result<Self, FamilyError> {
        if let Some(code) = codes.iter().find(|c| !CodeSet::in_range(**c)) {
            return Err(FamilyError::OutOfRange(*code));
        }
        let family = Self::codes(codes);
        if family.is_empty() {
            return Err(FamilyError::Empty);
        }
        Ok(family)
    }

    /// Logical OR of two families
    pub const fn union(self, other: Self) -> Self {
        Self {
            accepted: self.accepted.union(other.accepted),
        }
    }

    /// Membership test
    pub const fn accepts(&self, code: u16) -> bool {
        self.accepted.contains(code)
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Every accepted code in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (MIN_STATUS..=MAX_STATUS).filter(move |code| self.accepts(*code))
    }

    fn covers(&self, class: StatusClass) -> bool {
        let (lo, hi) = class.range();
        (lo..=hi).all(|code| self.accepts(code))
    }
}

impl fmt::Display for ResponseCodeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tokens = Vec::new();
        for class in StatusClass::ALL {
            if self.covers(class) {
                tokens.push(class.as_str().to_string());
            } else {
                let (lo, hi) = class.range();
                tokens.extend((lo..=hi).filter(|c| self.accepts(*c)).map(|c| c.to_string()));
            }
        }

        if tokens.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", tokens.join("|"))
        }
    }
}

impl FromStr for ResponseCodeFamily {
    type Err = FamilyError;

    /// Parse `4XX`, `200`, or a `|`/`,`-separated list of either
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut family = Self::codes(&[]);

        for token in s.split(['|', ',']).map(str::trim).filter(|t| !t.is_empty()) {
            let part = parse_token(token)?;
            family = family.union(part);
        }

        if family.is_empty() {
            return Err(FamilyError::Empty);
        }
        Ok(family)
    }
}

fn parse_token(token: &str) -> Result<ResponseCodeFamily, FamilyError> {
    let upper = token.to_ascii_uppercase();
    if let Some(class) = StatusClass::ALL.into_iter().find(|c| c.as_str() == upper) {
        return Ok(ResponseCodeFamily::class(class));
    }

    let code: u16 = token
        .parse()
        .map_err(|_| FamilyError::InvalidToken(token.to_string()))?;
    ResponseCodeFamily::try_codes(&[code])
}

impl Serialize for ResponseCodeFamily {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
