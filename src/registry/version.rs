use nom::{
    IResult, Parser as NomParser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, one_of, space0},
    combinator::{all_consuming, map, map_res, opt},
    multi::separated_list1,
    sequence::{delimited, preceded, tuple},
};
use std::{cmp::Ordering, fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version `{0}`")]
    Version(String),
    #[error("invalid version requirement `{0}`")]
    Requirement(String),
}

/// One dot-separated pre-release identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PreIdentifier {
    Numeric(u64),
    Alpha(String),
}

impl Ord for PreIdentifier {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (PreIdentifier::Numeric(a), PreIdentifier::Numeric(b)) => a.cmp(b),
            (PreIdentifier::Numeric(_), PreIdentifier::Alpha(_)) => Ordering::Less,
            (PreIdentifier::Alpha(_), PreIdentifier::Numeric(_)) => Ordering::Greater,
            (PreIdentifier::Alpha(a), PreIdentifier::Alpha(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for PreIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PreIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreIdentifier::Numeric(n) => write!(f, "{n}"),
            PreIdentifier::Alpha(text) => f.write_str(text),
        }
    }
}

/// A semantic version. Build metadata is kept for display only.
#[derive(Clone, Debug, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Vec<PreIdentifier>,
    pub build: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: Vec::new(),
            build: None,
        }
    }

    pub fn parse(text: &str) -> Result<Self, VersionError> {
        all_consuming(delimited(space0, version, space0))
            .parse(text)
            .map(|(_, version)| version)
            .map_err(|_| VersionError::Version(text.to_string()))
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    fn triple(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.triple()
            .cmp(&other.triple())
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                // a pre-release sorts before its release
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            let pre: Vec<String> = self.pre.iter().map(ToString::to_string).collect();
            write!(f, "-{}", pre.join("."))?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Version::parse(text)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Exact,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Tilde,
    Caret,
    Wildcard,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Exact => "=",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
            Op::Tilde => "~",
            Op::Caret => "^",
            Op::Wildcard => "",
        }
    }
}

/// `op major[.minor[.patch]][-pre]`. Omitted parts act as wildcards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub pre: Vec<PreIdentifier>,
}

impl Comparator {
    pub fn matches(&self, version: &Version) -> bool {
        match self.op {
            Op::Exact | Op::Wildcard => self.matches_exact(version),
            Op::Greater => self.matches_greater(version),
            Op::GreaterEq => self.matches_exact(version) || self.matches_greater(version),
            Op::Less => !self.matches_exact(version) && !self.matches_greater(version),
            Op::LessEq => !self.matches_greater(version),
            Op::Tilde => self.matches_tilde(version),
            Op::Caret => self.matches_caret(version),
        }
    }

    fn matches_exact(&self, version: &Version) -> bool {
        if version.major != self.major {
            return false;
        }
        match self.minor {
            Some(minor) if version.minor != minor => return false,
            None => return true,
            _ => {}
        }
        match self.patch {
            Some(patch) if version.patch != patch => return false,
            None => return true,
            _ => {}
        }
        version.pre == self.pre
    }

    fn matches_greater(&self, version: &Version) -> bool {
        if version.major != self.major {
            return version.major > self.major;
        }
        let Some(minor) = self.minor else {
            return false;
        };
        if version.minor != minor {
            return version.minor > minor;
        }
        let Some(patch) = self.patch else {
            return false;
        };
        if version.patch != patch {
            return version.patch > patch;
        }
        Version {
            pre: version.pre.clone(),
            ..Version::new(0, 0, 0)
        } > Version {
            pre: self.pre.clone(),
            ..Version::new(0, 0, 0)
        }
    }

    fn matches_tilde(&self, version: &Version) -> bool {
        if version.major != self.major {
            return false;
        }
        match self.minor {
            Some(minor) if version.minor != minor => return false,
            None => return true,
            _ => {}
        }
        match self.patch {
            Some(patch) if version.patch != patch => version.patch > patch,
            None => true,
            _ => self.pre_at_least(version),
        }
    }

    fn matches_caret(&self, version: &Version) -> bool {
        if version.major != self.major {
            return false;
        }
        let Some(minor) = self.minor else {
            return true;
        };
        let Some(patch) = self.patch else {
            return if self.major > 0 {
                version.minor >= minor
            } else {
                version.minor == minor
            };
        };
        if self.major > 0 {
            if version.minor != minor {
                return version.minor > minor;
            } else if version.patch != patch {
                return version.patch > patch;
            }
        } else if minor > 0 {
            if version.minor != minor {
                return false;
            } else if version.patch != patch {
                return version.patch > patch;
            }
        } else if version.minor != minor || version.patch != patch {
            return false;
        }
        self.pre_at_least(version)
    }

    fn pre_at_least(&self, version: &Version) -> bool {
        let mine = Version {
            pre: self.pre.clone(),
            ..Version::new(0, 0, 0)
        };
        let theirs = Version {
            pre: version.pre.clone(),
            ..Version::new(0, 0, 0)
        };
        theirs >= mine
    }

    /// Pre-releases are only reachable through a comparator naming the same triple.
    fn allows_prerelease_of(&self, version: &Version) -> bool {
        self.major == version.major
            && self.minor == Some(version.minor)
            && self.patch == Some(version.patch)
            && !self.pre.is_empty()
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.op.symbol())?;
        write!(f, "{}", self.major)?;
        match self.minor {
            Some(minor) => write!(f, ".{minor}")?,
            None if self.op == Op::Wildcard => f.write_str(".*")?,
            None => {}
        }
        if let Some(patch) = self.patch {
            write!(f, ".{patch}")?;
        } else if self.op == Op::Wildcard && self.minor.is_some() {
            f.write_str(".*")?;
        }
        if !self.pre.is_empty() {
            let pre: Vec<String> = self.pre.iter().map(ToString::to_string).collect();
            write!(f, "-{}", pre.join("."))?;
        }
        Ok(())
    }
}

/// Comma-separated comparators, all of which must match. `*` has none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionReq {
    pub comparators: Vec<Comparator>,
}

impl VersionReq {
    pub const STAR: VersionReq = VersionReq {
        comparators: Vec::new(),
    };

    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::Requirement(text.to_string());
        let (_, parsed) = all_consuming(delimited(space0, requirement, space0))
            .parse(text)
            .map_err(|_| invalid())?;
        parsed.ok_or_else(invalid)
    }

    pub fn matches(&self, version: &Version) -> bool {
        if !self.comparators.iter().all(|comparator| comparator.matches(version)) {
            return false;
        }
        !version.is_prerelease()
            || self
                .comparators
                .iter()
                .any(|comparator| comparator.allows_prerelease_of(version))
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.comparators.is_empty() {
            return f.write_str("*");
        }
        let parts: Vec<String> = self.comparators.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(", "))
    }
}

impl FromStr for VersionReq {
    type Err = VersionError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        VersionReq::parse(text)
    }
}

fn number(input: &str) -> IResult<&str, u64> {
    map_res(digit1, |s: &str| s.parse::<u64>()).parse(input)
}

fn pre_identifier(input: &str) -> IResult<&str, PreIdentifier> {
    map(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-'),
        |text: &str| match text.parse::<u64>() {
            Ok(n) if !(text.len() > 1 && text.starts_with('0')) => PreIdentifier::Numeric(n),
            _ => PreIdentifier::Alpha(text.to_string()),
        },
    )
    .parse(input)
}

fn pre_release(input: &str) -> IResult<&str, Vec<PreIdentifier>> {
    preceded(char('-'), separated_list1(char('.'), pre_identifier)).parse(input)
}

fn build_metadata(input: &str) -> IResult<&str, String> {
    map(
        preceded(
            char('+'),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '.'),
        ),
        str::to_string,
    )
    .parse(input)
}

fn version(input: &str) -> IResult<&str, Version> {
    let (input, (major, _, minor, _, patch)) =
        tuple((number, char('.'), number, char('.'), number)).parse(input)?;
    let (input, pre) = opt(pre_release).parse(input)?;
    let (input, build) = opt(build_metadata).parse(input)?;
    Ok((
        input,
        Version {
            major,
            minor,
            patch,
            pre: pre.unwrap_or_default(),
            build,
        },
    ))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Part {
    Number(u64),
    Wild,
}

fn part(input: &str) -> IResult<&str, Part> {
    alt((map(one_of("*xX"), |_| Part::Wild), map(number, Part::Number))).parse(input)
}

fn op(input: &str) -> IResult<&str, Op> {
    alt((
        map(tag(">="), |_| Op::GreaterEq),
        map(tag("<="), |_| Op::LessEq),
        map(tag(">"), |_| Op::Greater),
        map(tag("<"), |_| Op::Less),
        map(tag("="), |_| Op::Exact),
        map(tag("~"), |_| Op::Tilde),
        map(tag("^"), |_| Op::Caret),
    ))
    .parse(input)
}

/// A comparator, or `None` for a bare `*`.
fn comparator(input: &str) -> IResult<&str, Option<Option<Comparator>>> {
    let (input, op) = opt(op).parse(input)?;
    let (input, _) = space0(input)?;
    let (input, major) = part(input)?;
    let (input, minor) = opt(preceded(char('.'), part)).parse(input)?;
    let (input, patch) = opt(preceded(char('.'), part)).parse(input)?;
    let (input, pre) = opt(pre_release).parse(input)?;
    let (input, _) = opt(build_metadata).parse(input)?;
    Ok((input, build_comparator(op, major, minor, patch, pre.unwrap_or_default())))
}

/// Outer `None` rejects the comparator, inner `None` is a bare wildcard.
fn build_comparator(
    op: Option<Op>,
    major: Part,
    minor: Option<Part>,
    patch: Option<Part>,
    pre: Vec<PreIdentifier>,
) -> Option<Option<Comparator>> {
    let parts = [Some(major), minor, patch];
    let wild_at = parts.iter().position(|part| matches!(part, Some(Part::Wild)));
    if let Some(index) = wild_at {
        // nothing concrete may follow a wildcard, and wildcards take no pre-release
        if parts[index + 1..].iter().any(|part| matches!(part, Some(Part::Number(_)))) || !pre.is_empty() {
            return None;
        }
    }
    let value = |part: Option<Part>| match part {
        Some(Part::Number(n)) => Some(n),
        _ => None,
    };
    let Some(major) = value(Some(major)) else {
        return match op {
            None | Some(Op::Exact) | Some(Op::GreaterEq) | Some(Op::LessEq) | Some(Op::Caret) | Some(Op::Tilde) => {
                Some(None)
            }
            _ => None,
        };
    };
    let (minor, patch) = (value(minor), value(patch));
    if !pre.is_empty() && patch.is_none() {
        return None;
    }
    let op = match op {
        Some(op) => op,
        None if wild_at.is_some() => Op::Wildcard,
        None => Op::Caret,
    };
    Some(Some(Comparator {
        op,
        major,
        minor,
        patch,
        pre,
    }))
}

/// `None` when a comparator is malformed.
fn requirement(input: &str) -> IResult<&str, Option<VersionReq>> {
    let (input, parsed) =
        separated_list1(tuple((space0, char(','), space0)), comparator).parse(input)?;
    let mut comparators = Vec::new();
    for item in parsed {
        match item {
            Some(Some(comparator)) => comparators.push(comparator),
            Some(None) => {}
            None => return Ok((input, None)),
        }
    }
    Ok((input, Some(VersionReq { comparators })))
}
